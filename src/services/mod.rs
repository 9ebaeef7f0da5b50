pub mod cleanup_service;
pub mod emission_service;
pub mod player_monitor;
pub mod playlist_service;
pub mod status_sync;

#[cfg(test)]
pub mod test_support {
    use chrono::NaiveDateTime;
    use diesel::prelude::*;
    use diesel::sqlite::SqliteConnection;
    use diesel_migrations::MigrationHarness;

    use crate::models::{
        Material, NewDepartment, NewEmissionSchedule, NewMaterial, NewMaterialSchedule, NewStand,
        NewStore,
    };

    pub fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").expect("in-memory sqlite");
        conn.run_pending_migrations(crate::db::MIGRATIONS)
            .expect("migrations");
        conn
    }

    pub fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    pub fn seed_stand(conn: &mut SqliteConnection) -> i32 {
        use crate::schema::{departments, stands, stores};

        let store_id: i32 = diesel::insert_into(stores::table)
            .values(&NewStore {
                name: "Main Store".to_string(),
                location: "Warsaw".to_string(),
            })
            .returning(stores::id)
            .get_result(conn)
            .unwrap();

        let department_id: i32 = diesel::insert_into(departments::table)
            .values(&NewDepartment {
                name: "Electronics".to_string(),
                store_id,
            })
            .returning(departments::id)
            .get_result(conn)
            .unwrap();

        diesel::insert_into(stands::table)
            .values(&NewStand {
                name: "Entrance Stand".to_string(),
                department_id,
                display_time: 5,
                transition_animation: "fade".to_string(),
            })
            .returning(stands::id)
            .get_result(conn)
            .unwrap()
    }

    pub fn seed_material(
        conn: &mut SqliteConnection,
        stand_id: i32,
        display_order: i32,
        status: &str,
    ) -> i32 {
        use crate::schema::materials;

        diesel::insert_into(materials::table)
            .values(&NewMaterial {
                stand_id,
                material_type: "image".to_string(),
                file_path: format!("advertisements/{}/{}.jpg", stand_id, display_order),
                display_order,
                status: status.to_string(),
                duration: 5,
                expires_at: None,
            })
            .returning(materials::id)
            .get_result(conn)
            .unwrap()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn seed_schedule(
        conn: &mut SqliteConnection,
        name: &str,
        start_date: &str,
        end_date: Option<&str>,
        start_time: &str,
        end_time: &str,
        repeat_type: &str,
        repeat_days: Option<&str>,
        priority: i32,
        is_active: bool,
    ) -> i32 {
        use crate::schema::emission_schedules;

        diesel::insert_into(emission_schedules::table)
            .values(&NewEmissionSchedule {
                name: name.to_string(),
                start_date: start_date.parse().unwrap(),
                end_date: end_date.map(|d| d.parse().unwrap()),
                start_time: start_time.parse().unwrap(),
                end_time: end_time.parse().unwrap(),
                repeat_type: repeat_type.to_string(),
                repeat_days: repeat_days.map(|d| d.to_string()),
                priority,
                is_active,
            })
            .returning(emission_schedules::id)
            .get_result(conn)
            .unwrap()
    }

    /// All-day daily schedule, open-ended from 2024-03-01.
    pub fn seed_daily_schedule(
        conn: &mut SqliteConnection,
        name: &str,
        priority: i32,
        is_active: bool,
    ) -> i32 {
        seed_schedule(
            conn,
            name,
            "2024-03-01",
            None,
            "00:00:00",
            "23:59:59",
            "daily",
            None,
            priority,
            is_active,
        )
    }

    pub fn attach(conn: &mut SqliteConnection, material_id: i32, schedule_id: i32) {
        use crate::schema::material_schedules;

        diesel::insert_into(material_schedules::table)
            .values(&NewMaterialSchedule {
                material_id,
                schedule_id,
            })
            .execute(conn)
            .unwrap();
    }

    pub fn set_expiry(conn: &mut SqliteConnection, material_id: i32, expiry: NaiveDateTime) {
        use crate::schema::materials::dsl::*;

        diesel::update(materials.filter(id.eq(material_id)))
            .set(expires_at.eq(Some(expiry)))
            .execute(conn)
            .unwrap();
    }

    pub fn material_status(conn: &mut SqliteConnection, material_id: i32) -> String {
        use crate::schema::materials::dsl::*;

        materials
            .filter(id.eq(material_id))
            .select(Material::as_select())
            .first(conn)
            .unwrap()
            .status
    }

    pub fn schedule_is_active(conn: &mut SqliteConnection, schedule_id: i32) -> bool {
        use crate::schema::emission_schedules::dsl::*;

        emission_schedules
            .filter(id.eq(schedule_id))
            .select(is_active)
            .first(conn)
            .unwrap()
    }
}
