use crate::models::{Material, NewMaterial, UpdateMaterial};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Deserialize;

const MATERIAL_TYPES: &[&str] = &["image", "video"];
const STATUSES: &[&str] = &["active", "inactive"];

pub async fn list_materials(
    State(state): State<AppState>,
    Path(target_stand_id): Path<i32>,
) -> Result<Json<Vec<Material>>, StatusCode> {
    use crate::schema::{materials, stands};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let stand_exists: Option<i32> = stands::table
        .find(target_stand_id)
        .select(stands::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if stand_exists.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let results = materials::table
        .filter(materials::stand_id.eq(target_stand_id))
        .order(materials::display_order.asc())
        .select(Material::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

#[derive(Deserialize)]
pub struct CreateMaterial {
    pub material_type: String,
    pub file_path: String,
    #[serde(default = "default_duration")]
    pub duration: i32,
    #[serde(default = "default_status")]
    pub status: String,
    pub expires_at: Option<NaiveDateTime>,
}

fn default_duration() -> i32 {
    5
}

fn default_status() -> String {
    "active".to_string()
}

pub async fn create_material(
    State(state): State<AppState>,
    Path(target_stand_id): Path<i32>,
    Json(body): Json<CreateMaterial>,
) -> Result<Json<Material>, StatusCode> {
    use crate::schema::{materials, stands};

    if !MATERIAL_TYPES.contains(&body.material_type.as_str())
        || !STATUSES.contains(&body.status.as_str())
        || body.duration < 1
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let stand_exists: Option<i32> = stands::table
        .find(target_stand_id)
        .select(stands::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if stand_exists.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    // New materials go to the end of the carousel.
    let count: i64 = materials::table
        .filter(materials::stand_id.eq(target_stand_id))
        .count()
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let material = diesel::insert_into(materials::table)
        .values(&NewMaterial {
            stand_id: target_stand_id,
            material_type: body.material_type,
            file_path: body.file_path,
            display_order: count as i32,
            status: body.status,
            duration: body.duration,
            expires_at: body.expires_at,
        })
        .returning(Material::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(material))
}

pub async fn update_material(
    State(state): State<AppState>,
    Path(material_id): Path<i32>,
    Json(updates): Json<UpdateMaterial>,
) -> Result<Json<Material>, StatusCode> {
    use crate::schema::materials::dsl::*;

    if let Some(new_type) = &updates.material_type {
        if !MATERIAL_TYPES.contains(&new_type.as_str()) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    if let Some(new_status) = &updates.status {
        if !STATUSES.contains(&new_status.as_str()) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    if matches!(updates.duration, Some(d) if d < 1) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let material = diesel::update(materials.find(material_id))
        .set(&updates)
        .returning(Material::as_select())
        .get_result(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(material))
}

pub async fn delete_material(
    State(state): State<AppState>,
    Path(material_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::{material_schedules, materials};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(
            material_schedules::table.filter(material_schedules::material_id.eq(material_id)),
        )
        .execute(conn)?;
        diesel::delete(materials::table.find(material_id)).execute(conn)?;
        Ok(())
    })
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
