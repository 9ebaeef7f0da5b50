use crate::models::{
    EmissionSchedule, NewEmissionSchedule, NewMaterialSchedule, RepeatType, UpdateEmissionSchedule,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use diesel::prelude::*;

pub async fn list_schedules(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmissionSchedule>>, StatusCode> {
    use crate::schema::emission_schedules::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = emission_schedules
        .order(id.asc())
        .select(EmissionSchedule::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<i32>,
) -> Result<Json<EmissionSchedule>, StatusCode> {
    use crate::schema::emission_schedules::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let schedule = emission_schedules
        .find(schedule_id)
        .select(EmissionSchedule::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(schedule))
}

/// Creation-time validation. The evaluator tolerates malformed rows, but
/// nothing malformed should get in through the API.
fn validate_schedule_fields(
    repeat_type: &str,
    repeat_days: Option<&str>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<(), StatusCode> {
    let parsed = RepeatType::parse(repeat_type).ok_or(StatusCode::BAD_REQUEST)?;

    if parsed == RepeatType::Weekly {
        let has_valid_day = repeat_days
            .map(|raw| {
                raw.split(',')
                    .filter_map(|part| part.trim().parse::<u32>().ok())
                    .any(|day| day <= 6)
            })
            .unwrap_or(false);
        if !has_valid_day {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    if let Some(end) = end_date {
        if end < start_date {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    Ok(())
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(new_schedule): Json<NewEmissionSchedule>,
) -> Result<Json<EmissionSchedule>, StatusCode> {
    use crate::schema::emission_schedules;

    validate_schedule_fields(
        &new_schedule.repeat_type,
        new_schedule.repeat_days.as_deref(),
        new_schedule.start_date,
        new_schedule.end_date,
    )?;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let schedule = diesel::insert_into(emission_schedules::table)
        .values(&new_schedule)
        .returning(EmissionSchedule::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(schedule))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<i32>,
    Json(updates): Json<UpdateEmissionSchedule>,
) -> Result<Json<EmissionSchedule>, StatusCode> {
    use crate::schema::emission_schedules::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let existing: EmissionSchedule = emission_schedules
        .find(schedule_id)
        .select(EmissionSchedule::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // Validate the row as it will look after the update.
    let effective_repeat_type = updates
        .repeat_type
        .as_deref()
        .unwrap_or(&existing.repeat_type);
    let effective_repeat_days = match &updates.repeat_days {
        Some(replacement) => replacement.as_deref(),
        None => existing.repeat_days.as_deref(),
    };
    let effective_start = updates.start_date.unwrap_or(existing.start_date);
    let effective_end = match updates.end_date {
        Some(replacement) => replacement,
        None => existing.end_date,
    };
    validate_schedule_fields(
        effective_repeat_type,
        effective_repeat_days,
        effective_start,
        effective_end,
    )?;

    let schedule = diesel::update(emission_schedules.find(schedule_id))
        .set(&updates)
        .returning(EmissionSchedule::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(schedule))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::{emission_schedules, material_schedules};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(
            material_schedules::table.filter(material_schedules::schedule_id.eq(schedule_id)),
        )
        .execute(conn)?;
        diesel::delete(emission_schedules::table.find(schedule_id)).execute(conn)?;
        Ok(())
    })
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_schedule_materials(
    State(state): State<AppState>,
    Path(target_schedule_id): Path<i32>,
) -> Result<Json<Vec<i32>>, StatusCode> {
    use crate::schema::material_schedules::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let ids = material_schedules
        .filter(schedule_id.eq(target_schedule_id))
        .order(material_id.asc())
        .select(material_id)
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(ids))
}

/// Replaces the schedule's material set wholesale. Ids pointing at deleted
/// materials are rejected so the join table never dangles.
pub async fn set_schedule_materials(
    State(state): State<AppState>,
    Path(target_schedule_id): Path<i32>,
    Json(material_ids): Json<Vec<i32>>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::{emission_schedules, material_schedules, materials};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let schedule_exists: Option<i32> = emission_schedules::table
        .find(target_schedule_id)
        .select(emission_schedules::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if schedule_exists.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let known: Vec<i32> = materials::table
        .filter(materials::id.eq_any(&material_ids))
        .select(materials::id)
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if known.len() != material_ids.len() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let ids_ref = &material_ids;
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(
            material_schedules::table
                .filter(material_schedules::schedule_id.eq(target_schedule_id)),
        )
        .execute(conn)?;
        for m_id in ids_ref {
            diesel::insert_into(material_schedules::table)
                .values(&NewMaterialSchedule {
                    material_id: *m_id,
                    schedule_id: target_schedule_id,
                })
                .execute(conn)?;
        }
        Ok(())
    })
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
