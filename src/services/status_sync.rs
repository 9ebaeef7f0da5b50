//! Periodic status synchronization.
//!
//! The only writer of derived state: flips `is_active` off on schedules whose
//! end has passed, then recomputes material `status` from the remaining
//! active schedules so that consumers unaware of scheduling still see a
//! consistent picture. Idempotent and safe to re-run.

use anyhow::Result;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use std::time::Duration;
use tokio::time::interval;

use crate::models::EmissionSchedule;
use crate::services::emission_service::{is_live, resolve_priorities};
use crate::AppState;

#[derive(Debug, Default, Serialize)]
pub struct StatusSyncReport {
    pub schedules_deactivated: Vec<i32>,
    pub materials_activated: Vec<i32>,
    pub materials_deactivated: Vec<i32>,
}

pub async fn run(state: AppState) {
    let tz = match state.config.timezone() {
        Ok(tz) => tz,
        Err(e) => {
            tracing::error!("Status sync disabled: {}", e);
            return;
        }
    };

    let mut tick = interval(Duration::from_secs(state.config.scheduler.sync_interval_secs));

    loop {
        tick.tick().await;

        // Advisory guard shared with the manual trigger endpoint.
        let _guard = state.sync_guard.lock().await;

        let pool = state.db.clone();
        let now = chrono::Utc::now().with_timezone(&tz).naive_local();

        let result = tokio::task::spawn_blocking(move || -> Result<StatusSyncReport> {
            let mut conn = pool.get()?;
            run_status_sync(&mut conn, now)
        })
        .await;

        match result {
            Ok(Ok(report)) => {
                if !report.schedules_deactivated.is_empty()
                    || !report.materials_activated.is_empty()
                    || !report.materials_deactivated.is_empty()
                {
                    tracing::info!(
                        "Status sync: {} schedules deactivated, {} materials activated, {} deactivated",
                        report.schedules_deactivated.len(),
                        report.materials_activated.len(),
                        report.materials_deactivated.len()
                    );
                }
            }
            Ok(Err(e)) => tracing::error!("Status sync run failed: {:#}", e),
            Err(e) => tracing::error!("Status sync task panic: {}", e),
        }
    }
}

/// One synchronization pass against the store, at the given localized `now`.
pub fn run_status_sync(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
) -> Result<StatusSyncReport> {
    let mut report = StatusSyncReport::default();

    report.schedules_deactivated = deactivate_ended_schedules(conn, now)?;
    let (activated, deactivated) = synchronize_material_statuses(conn, now)?;
    report.materials_activated = activated;
    report.materials_deactivated = deactivated;

    Ok(report)
}

/// Step 1: a schedule with an end_date strictly in the past, or ending today
/// with an end_time already behind us, is switched off. Open-ended schedules
/// never auto-expire.
fn deactivate_ended_schedules(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
) -> Result<Vec<i32>> {
    use crate::schema::emission_schedules::dsl::*;

    let active: Vec<EmissionSchedule> = emission_schedules
        .filter(is_active.eq(true))
        .select(EmissionSchedule::as_select())
        .load(conn)?;

    let today = now.date();
    let current_time = now.time();

    let mut ended: Vec<i32> = active
        .iter()
        .filter(|schedule| match schedule.end_date {
            Some(end) => end < today || (end == today && schedule.end_time < current_time),
            None => false,
        })
        .map(|schedule| schedule.id)
        .collect();
    ended.sort_unstable();

    if !ended.is_empty() {
        let ended_ref = &ended;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::update(emission_schedules.filter(id.eq_any(ended_ref)))
                .set(is_active.eq(false))
                .execute(conn)
                .map(|_| ())
        })?;
        tracing::info!("Deactivated ended schedules: {:?}", ended);
    }

    Ok(ended)
}

/// Step 2: materials with at least one live schedule become active; materials
/// attached to schedules but with none live become inactive. Materials with
/// no schedule attachments at all are owned by editors and expiry, never by
/// this job.
fn synchronize_material_statuses(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
) -> Result<(Vec<i32>, Vec<i32>)> {
    use crate::schema::{emission_schedules, material_schedules, materials};

    let scheduled_ids: Vec<i32> = material_schedules::table
        .select(material_schedules::material_id)
        .distinct()
        .load(conn)?;

    if scheduled_ids.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let active_refs: Vec<(i32, EmissionSchedule)> = material_schedules::table
        .inner_join(emission_schedules::table)
        .filter(emission_schedules::is_active.eq(true))
        .select((
            material_schedules::material_id,
            EmissionSchedule::as_select(),
        ))
        .load(conn)?;

    let priorities = resolve_priorities(
        active_refs
            .iter()
            .filter(|(_, schedule)| is_live(schedule, now))
            .map(|(material_id, schedule)| (*material_id, schedule.priority)),
    );

    let mut to_activate: Vec<i32> = priorities.keys().copied().collect();
    to_activate.sort_unstable();

    let mut to_deactivate: Vec<i32> = scheduled_ids
        .into_iter()
        .filter(|material_id| !priorities.contains_key(material_id))
        .collect();
    to_deactivate.sort_unstable();

    let (activate_ref, deactivate_ref) = (&to_activate, &to_deactivate);
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        if !activate_ref.is_empty() {
            diesel::update(materials::table.filter(materials::id.eq_any(activate_ref)))
                .set(materials::status.eq("active"))
                .execute(conn)?;
        }
        if !deactivate_ref.is_empty() {
            diesel::update(materials::table.filter(materials::id.eq_any(deactivate_ref)))
                .set(materials::status.eq("inactive"))
                .execute(conn)?;
        }
        Ok(())
    })?;

    Ok((to_activate, to_deactivate))
}
