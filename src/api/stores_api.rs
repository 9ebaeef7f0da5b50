use crate::models::{Department, NewDepartment, NewStore, Store};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;

pub async fn list_stores(State(state): State<AppState>) -> Result<Json<Vec<Store>>, StatusCode> {
    use crate::schema::stores::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = stores
        .order(name.asc())
        .select(Store::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_store(
    State(state): State<AppState>,
    Json(new_store): Json<NewStore>,
) -> Result<Json<Store>, StatusCode> {
    use crate::schema::stores;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let store = diesel::insert_into(stores::table)
        .values(&new_store)
        .returning(Store::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(store))
}

#[derive(Deserialize)]
pub struct UpdateStore {
    pub name: Option<String>,
    pub location: Option<String>,
}

pub async fn update_store(
    State(state): State<AppState>,
    Path(store_id): Path<i32>,
    Json(updates): Json<UpdateStore>,
) -> Result<Json<Store>, StatusCode> {
    use crate::schema::stores::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let existing: Store = stores
        .find(store_id)
        .select(Store::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let store = diesel::update(stores.find(store_id))
        .set((
            name.eq(updates.name.unwrap_or(existing.name)),
            location.eq(updates.location.unwrap_or(existing.location)),
        ))
        .returning(Store::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(store))
}

pub async fn delete_store(
    State(state): State<AppState>,
    Path(target_store_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::{departments, stores};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Manual cascade down the whole hierarchy.
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let department_ids: Vec<i32> = departments::table
            .filter(departments::store_id.eq(target_store_id))
            .select(departments::id)
            .load(conn)?;
        for department_id in department_ids {
            delete_department_tree(conn, department_id)?;
        }
        diesel::delete(stores::table.find(target_store_id)).execute(conn)?;
        Ok(())
    })
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes a department with its stands, their materials and schedule
/// associations. Caller provides the transaction.
fn delete_department_tree(
    conn: &mut diesel::sqlite::SqliteConnection,
    department_id: i32,
) -> Result<(), diesel::result::Error> {
    use crate::schema::{departments, material_schedules, materials, player_statuses, stands};

    let stand_ids: Vec<i32> = stands::table
        .filter(stands::department_id.eq(department_id))
        .select(stands::id)
        .load(conn)?;
    let material_ids: Vec<i32> = materials::table
        .filter(materials::stand_id.eq_any(&stand_ids))
        .select(materials::id)
        .load(conn)?;

    diesel::delete(
        material_schedules::table.filter(material_schedules::material_id.eq_any(&material_ids)),
    )
    .execute(conn)?;
    diesel::delete(materials::table.filter(materials::stand_id.eq_any(&stand_ids)))
        .execute(conn)?;
    diesel::delete(player_statuses::table.filter(player_statuses::stand_id.eq_any(&stand_ids)))
        .execute(conn)?;
    diesel::delete(stands::table.filter(stands::department_id.eq(department_id))).execute(conn)?;
    diesel::delete(departments::table.find(department_id)).execute(conn)?;

    Ok(())
}

pub async fn list_departments(
    State(state): State<AppState>,
    Path(target_store_id): Path<i32>,
) -> Result<Json<Vec<Department>>, StatusCode> {
    use crate::schema::departments::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = departments
        .filter(store_id.eq(target_store_id))
        .order(name.asc())
        .select(Department::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

#[derive(Deserialize)]
pub struct CreateDepartment {
    pub name: String,
}

pub async fn create_department(
    State(state): State<AppState>,
    Path(target_store_id): Path<i32>,
    Json(body): Json<CreateDepartment>,
) -> Result<Json<Department>, StatusCode> {
    use crate::schema::{departments, stores};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let store_exists: Option<i32> = stores::table
        .find(target_store_id)
        .select(stores::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if store_exists.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let department = diesel::insert_into(departments::table)
        .values(&NewDepartment {
            name: body.name,
            store_id: target_store_id,
        })
        .returning(Department::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(department))
}

pub async fn update_department(
    State(state): State<AppState>,
    Path(department_id): Path<i32>,
    Json(body): Json<CreateDepartment>,
) -> Result<Json<Department>, StatusCode> {
    use crate::schema::departments::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let department = diesel::update(departments.find(department_id))
        .set(name.eq(body.name))
        .returning(Department::as_select())
        .get_result(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(department))
}

pub async fn delete_department(
    State(state): State<AppState>,
    Path(department_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        delete_department_tree(conn, department_id)
    })
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
