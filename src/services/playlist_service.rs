use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{EmissionSchedule, Material, Stand};
use crate::services::emission_service::{is_live, resolve_priorities};

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("stand {0} not found")]
    StandNotFound(i32),
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistEntry {
    pub material_id: i32,
    pub material_type: String,
    pub file_path: String,
    pub duration: i32,
    /// Highest priority among the live schedules that selected this
    /// material. Absent when the stand is in unscheduled fallback mode.
    pub resolved_priority: Option<i32>,
}

impl PlaylistEntry {
    fn from_material(material: &Material, resolved_priority: Option<i32>) -> Self {
        PlaylistEntry {
            material_id: material.id,
            material_type: material.material_type.clone(),
            file_path: material.file_path.clone(),
            duration: material.duration,
            resolved_priority,
        }
    }
}

/// Resolves what a stand should display at `now`.
///
/// The switch between scheduled mode and fallback mode is per stand, not per
/// material: as soon as any schedule referencing the stand's materials is
/// live, only materials selected by live schedules are returned, ordered by
/// resolved priority (descending) then display_order. With no live schedule
/// at all, every displayable material is returned in display_order.
pub fn eligible_materials(
    conn: &mut SqliteConnection,
    target_stand_id: i32,
    now: NaiveDateTime,
) -> Result<Vec<PlaylistEntry>, PlaylistError> {
    use crate::schema::{emission_schedules, material_schedules, materials, stands};

    let stand: Option<Stand> = stands::table
        .find(target_stand_id)
        .select(Stand::as_select())
        .first(conn)
        .optional()?;
    if stand.is_none() {
        return Err(PlaylistError::StandNotFound(target_stand_id));
    }

    let stand_materials: Vec<Material> = materials::table
        .filter(materials::stand_id.eq(target_stand_id))
        .order(materials::display_order.asc())
        .select(Material::as_select())
        .load(conn)?;

    if stand_materials.is_empty() {
        return Ok(Vec::new());
    }

    let material_ids: Vec<i32> = stand_materials.iter().map(|m| m.id).collect();

    // Every schedule reference touching this stand's materials. A dangling
    // reference (material deleted mid-evaluation) simply never matches a
    // loaded material below.
    let schedule_refs: Vec<(i32, EmissionSchedule)> = material_schedules::table
        .inner_join(emission_schedules::table)
        .filter(material_schedules::material_id.eq_any(&material_ids))
        .select((
            material_schedules::material_id,
            EmissionSchedule::as_select(),
        ))
        .load(conn)?;

    let any_live = schedule_refs
        .iter()
        .any(|(_, schedule)| is_live(schedule, now));

    if !any_live {
        // Fallback mode: the stand's own material list, stored order.
        return Ok(stand_materials
            .iter()
            .filter(|m| m.is_displayable(now))
            .map(|m| PlaylistEntry::from_material(m, None))
            .collect());
    }

    let displayable: HashSet<i32> = stand_materials
        .iter()
        .filter(|m| m.is_displayable(now))
        .map(|m| m.id)
        .collect();

    let priorities = resolve_priorities(
        schedule_refs
            .iter()
            .filter(|(material_id, schedule)| {
                displayable.contains(material_id) && is_live(schedule, now)
            })
            .map(|(material_id, schedule)| (*material_id, schedule.priority)),
    );

    // stand_materials is already in display_order, so a stable sort on
    // priority alone would do; the explicit tie-break keeps the rule visible.
    let mut selected: Vec<(&Material, i32)> = stand_materials
        .iter()
        .filter_map(|m| priorities.get(&m.id).map(|p| (m, *p)))
        .collect();
    selected.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then(a.0.display_order.cmp(&b.0.display_order))
    });

    Ok(selected
        .into_iter()
        .map(|(m, priority)| PlaylistEntry::from_material(m, Some(priority)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;

    #[test]
    fn test_unknown_stand_is_not_found() {
        let mut conn = test_conn();
        let err = eligible_materials(&mut conn, 999, dt("2024-03-15 12:00:00")).unwrap_err();
        assert!(matches!(err, PlaylistError::StandNotFound(999)));
    }

    #[test]
    fn test_stand_without_materials_is_a_valid_empty_playlist() {
        let mut conn = test_conn();
        let stand_id = seed_stand(&mut conn);
        let playlist = eligible_materials(&mut conn, stand_id, dt("2024-03-15 12:00:00")).unwrap();
        assert!(playlist.is_empty());
    }

    #[test]
    fn test_fallback_returns_active_materials_in_display_order() {
        let mut conn = test_conn();
        let stand_id = seed_stand(&mut conn);
        let b = seed_material(&mut conn, stand_id, 1, "active");
        let a = seed_material(&mut conn, stand_id, 0, "active");
        seed_material(&mut conn, stand_id, 2, "inactive");

        let playlist = eligible_materials(&mut conn, stand_id, dt("2024-03-15 12:00:00")).unwrap();
        let ids: Vec<i32> = playlist.iter().map(|e| e.material_id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(playlist.iter().all(|e| e.resolved_priority.is_none()));
    }

    #[test]
    fn test_live_schedule_suppresses_unscheduled_materials() {
        let mut conn = test_conn();
        let stand_id = seed_stand(&mut conn);
        let unscheduled = seed_material(&mut conn, stand_id, 0, "active");
        let scheduled = seed_material(&mut conn, stand_id, 1, "active");
        let schedule_id = seed_daily_schedule(&mut conn, "promo", 5, true);
        attach(&mut conn, scheduled, schedule_id);

        let playlist = eligible_materials(&mut conn, stand_id, dt("2024-03-15 12:00:00")).unwrap();
        let ids: Vec<i32> = playlist.iter().map(|e| e.material_id).collect();
        assert_eq!(ids, vec![scheduled]);
        assert_eq!(playlist[0].resolved_priority, Some(5));
        assert!(!ids.contains(&unscheduled));
    }

    #[test]
    fn test_highest_priority_wins_across_live_schedules() {
        let mut conn = test_conn();
        let stand_id = seed_stand(&mut conn);
        let material_id = seed_material(&mut conn, stand_id, 0, "active");
        let low = seed_daily_schedule(&mut conn, "low", 3, true);
        let high = seed_daily_schedule(&mut conn, "high", 7, true);
        attach(&mut conn, material_id, low);
        attach(&mut conn, material_id, high);

        let playlist = eligible_materials(&mut conn, stand_id, dt("2024-03-15 12:00:00")).unwrap();
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist[0].resolved_priority, Some(7));
    }

    #[test]
    fn test_priority_ordering_with_display_order_tie_break() {
        let mut conn = test_conn();
        let stand_id = seed_stand(&mut conn);
        let first = seed_material(&mut conn, stand_id, 0, "active");
        let second = seed_material(&mut conn, stand_id, 1, "active");
        let third = seed_material(&mut conn, stand_id, 2, "active");
        let low = seed_daily_schedule(&mut conn, "low", 1, true);
        let high = seed_daily_schedule(&mut conn, "high", 9, true);
        attach(&mut conn, first, low);
        attach(&mut conn, second, high);
        attach(&mut conn, third, low);

        let playlist = eligible_materials(&mut conn, stand_id, dt("2024-03-15 12:00:00")).unwrap();
        let ids: Vec<i32> = playlist.iter().map(|e| e.material_id).collect();
        // Priority 9 first, then the two priority-1 entries in display_order.
        assert_eq!(ids, vec![second, first, third]);
    }

    #[test]
    fn test_inactive_schedule_falls_back_to_stored_order() {
        let mut conn = test_conn();
        let stand_id = seed_stand(&mut conn);
        let a = seed_material(&mut conn, stand_id, 0, "active");
        let b = seed_material(&mut conn, stand_id, 1, "active");
        let schedule_id = seed_daily_schedule(&mut conn, "disabled", 5, false);
        attach(&mut conn, b, schedule_id);

        let playlist = eligible_materials(&mut conn, stand_id, dt("2024-03-15 12:00:00")).unwrap();
        let ids: Vec<i32> = playlist.iter().map(|e| e.material_id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_expired_material_is_hidden_lazily() {
        let mut conn = test_conn();
        let stand_id = seed_stand(&mut conn);
        let fresh = seed_material(&mut conn, stand_id, 0, "active");
        let expired = seed_material(&mut conn, stand_id, 1, "active");
        set_expiry(&mut conn, expired, dt("2024-03-01 00:00:00"));

        let playlist = eligible_materials(&mut conn, stand_id, dt("2024-03-15 12:00:00")).unwrap();
        let ids: Vec<i32> = playlist.iter().map(|e| e.material_id).collect();
        assert_eq!(ids, vec![fresh]);
    }

    #[test]
    fn test_overnight_schedule_is_live_before_and_after_midnight() {
        let mut conn = test_conn();
        let stand_id = seed_stand(&mut conn);
        let material_id = seed_material(&mut conn, stand_id, 0, "active");
        let schedule_id = seed_schedule(
            &mut conn,
            "night",
            "2024-03-01",
            None,
            "22:00:00",
            "06:00:00",
            "daily",
            None,
            4,
            true,
        );
        attach(&mut conn, material_id, schedule_id);

        for at in ["2024-03-15 23:00:00", "2024-03-15 00:30:00"] {
            let playlist = eligible_materials(&mut conn, stand_id, dt(at)).unwrap();
            assert_eq!(playlist.len(), 1, "expected live playlist at {}", at);
        }
        let midday = eligible_materials(&mut conn, stand_id, dt("2024-03-15 12:00:00")).unwrap();
        // Window closed, no other live schedule: fallback mode again.
        assert_eq!(midday[0].resolved_priority, None);
    }
}
