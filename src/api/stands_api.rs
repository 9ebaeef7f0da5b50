use crate::models::{Material, NewStand, Stand, UpdateStand};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Serialize;

pub async fn list_stands(State(state): State<AppState>) -> Result<Json<Vec<Stand>>, StatusCode> {
    use crate::schema::stands::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = stands
        .order(name.asc())
        .select(Stand::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

#[derive(Serialize)]
pub struct StandDetail {
    #[serde(flatten)]
    pub stand: Stand,
    pub materials: Vec<Material>,
}

pub async fn get_stand(
    State(state): State<AppState>,
    Path(target_stand_id): Path<i32>,
) -> Result<Json<StandDetail>, StatusCode> {
    use crate::schema::{materials, stands};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let stand: Stand = stands::table
        .find(target_stand_id)
        .select(Stand::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let stand_materials = materials::table
        .filter(materials::stand_id.eq(target_stand_id))
        .order(materials::display_order.asc())
        .select(Material::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(StandDetail {
        stand,
        materials: stand_materials,
    }))
}

const ANIMATIONS: &[&str] = &["fade", "slide", "zoom", "flip", "none"];

pub async fn create_stand(
    State(state): State<AppState>,
    Json(new_stand): Json<NewStand>,
) -> Result<Json<Stand>, StatusCode> {
    use crate::schema::{departments, stands};

    if !ANIMATIONS.contains(&new_stand.transition_animation.as_str()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let department_exists: Option<i32> = departments::table
        .find(new_stand.department_id)
        .select(departments::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if department_exists.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let stand = diesel::insert_into(stands::table)
        .values(&new_stand)
        .returning(Stand::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(stand))
}

pub async fn update_stand(
    State(state): State<AppState>,
    Path(target_stand_id): Path<i32>,
    Json(updates): Json<UpdateStand>,
) -> Result<Json<Stand>, StatusCode> {
    use crate::schema::stands::dsl::*;

    if let Some(animation) = &updates.transition_animation {
        if !ANIMATIONS.contains(&animation.as_str()) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let stand = diesel::update(stands.find(target_stand_id))
        .set(&updates)
        .returning(Stand::as_select())
        .get_result(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(stand))
}

pub async fn delete_stand(
    State(state): State<AppState>,
    Path(target_stand_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::{material_schedules, materials, player_statuses, stands};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Cascade by hand: associations, then materials, then the stand.
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let material_ids: Vec<i32> = materials::table
            .filter(materials::stand_id.eq(target_stand_id))
            .select(materials::id)
            .load(conn)?;
        diesel::delete(
            material_schedules::table
                .filter(material_schedules::material_id.eq_any(&material_ids)),
        )
        .execute(conn)?;
        diesel::delete(materials::table.filter(materials::stand_id.eq(target_stand_id)))
            .execute(conn)?;
        diesel::delete(
            player_statuses::table.filter(player_statuses::stand_id.eq(target_stand_id)),
        )
        .execute(conn)?;
        diesel::delete(stands::table.find(target_stand_id)).execute(conn)?;
        Ok(())
    })
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Drag & drop reorder: the body is the full list of the stand's material
/// ids in their new sequence.
pub async fn update_material_order(
    State(state): State<AppState>,
    Path(target_stand_id): Path<i32>,
    Json(ordered_ids): Json<Vec<i32>>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::materials;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let owned_ids: Vec<i32> = materials::table
        .filter(materials::stand_id.eq(target_stand_id))
        .select(materials::id)
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Reject ids that belong to another stand.
    if ordered_ids.iter().any(|m| !owned_ids.contains(m)) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let ordered_ref = &ordered_ids;
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        for (index, material_id) in ordered_ref.iter().enumerate() {
            diesel::update(materials::table.find(*material_id))
                .set(materials::display_order.eq(index as i32))
                .execute(conn)?;
        }
        Ok(())
    })
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
