//! Pure schedule evaluation rules.
//!
//! Everything here is deterministic given an explicit `now`; callers are
//! responsible for localizing the clock once (see `Config::timezone`) so the
//! date and the time-of-day are extracted from the same instant.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;

use crate::models::{EmissionSchedule, RepeatType};

/// Does this schedule apply on the given calendar date?
///
/// Malformed rows (unknown repeat type, weekly with no days selected) are
/// never-applicable rather than an error; validation belongs to the API
/// boundary, not the evaluator.
pub fn applies_on_date(schedule: &EmissionSchedule, date: NaiveDate) -> bool {
    if date < schedule.start_date {
        return false;
    }
    if let Some(end_date) = schedule.end_date {
        if date > end_date {
            return false;
        }
    }

    match schedule.repeat_type() {
        Some(RepeatType::None) => date == schedule.start_date,
        Some(RepeatType::Daily) => true,
        Some(RepeatType::Weekly) => {
            let days = schedule.repeat_days();
            if days.is_empty() {
                return false;
            }
            days.contains(&date.weekday().num_days_from_monday())
        }
        Some(RepeatType::Monthly) => monthly_match(schedule.start_date, date),
        // "custom" is a declared recurrence class without an evaluator yet.
        Some(RepeatType::Custom) => false,
        None => false,
    }
}

/// Day-of-month match with the last-day rule: a schedule anchored to the
/// last day of a month (day >= 28) recurs on the last day of every month,
/// so Jan 31 covers Feb 28/29 and Mar 31.
fn monthly_match(start_date: NaiveDate, date: NaiveDate) -> bool {
    let anchor_day = start_date.day();
    if anchor_day >= 28 && anchor_day == last_day_of_month(start_date) {
        date.day() == last_day_of_month(date)
    } else {
        date.day() == anchor_day
    }
}

fn last_day_of_month(date: NaiveDate) -> u32 {
    let (next_year, next_month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    // The 1st of every month exists, so this cannot fail for a valid date.
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Is the schedule's time-of-day window open at `time`?
/// `start_time > end_time` denotes an overnight window crossing midnight.
/// Both endpoints are inclusive.
pub fn active_at_time(schedule: &EmissionSchedule, time: NaiveTime) -> bool {
    if schedule.start_time <= schedule.end_time {
        schedule.start_time <= time && time <= schedule.end_time
    } else {
        time >= schedule.start_time || time <= schedule.end_time
    }
}

/// The single source of truth for "is this schedule driving emission right
/// now". Combines the active flag, date applicability and the time window.
pub fn is_live(schedule: &EmissionSchedule, now: NaiveDateTime) -> bool {
    schedule.is_active && applies_on_date(schedule, now.date()) && active_at_time(schedule, now.time())
}

/// Highest priority per material across all live schedule references.
/// Input pairs are (material_id, schedule_priority) for live schedules only;
/// a material absent from the result simply has no live schedule right now.
pub fn resolve_priorities(pairs: impl IntoIterator<Item = (i32, i32)>) -> HashMap<i32, i32> {
    let mut priorities: HashMap<i32, i32> = HashMap::new();
    for (material_id, priority) in pairs {
        priorities
            .entry(material_id)
            .and_modify(|current| {
                if priority > *current {
                    *current = priority;
                }
            })
            .or_insert(priority);
    }
    priorities
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn schedule(
        start_date: &str,
        end_date: Option<&str>,
        start_time: &str,
        end_time: &str,
        repeat_type: &str,
        repeat_days: Option<&str>,
    ) -> EmissionSchedule {
        let created = NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        EmissionSchedule {
            id: 1,
            name: "test".to_string(),
            start_date: start_date.parse().unwrap(),
            end_date: end_date.map(|d| d.parse().unwrap()),
            start_time: start_time.parse().unwrap(),
            end_time: end_time.parse().unwrap(),
            repeat_type: repeat_type.to_string(),
            repeat_days: repeat_days.map(|d| d.to_string()),
            priority: 0,
            is_active: true,
            created_at: created,
            updated_at: created,
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_one_off_applies_only_on_start_date() {
        let s = schedule("2024-03-10", None, "08:00:00", "20:00:00", "none", None);
        assert!(applies_on_date(&s, date("2024-03-10")));
        assert!(!applies_on_date(&s, date("2024-03-11")));
        assert!(!applies_on_date(&s, date("2024-03-09")));
    }

    #[test]
    fn test_daily_applies_to_every_date_in_range() {
        let s = schedule(
            "2024-03-01",
            Some("2024-03-31"),
            "08:00:00",
            "20:00:00",
            "daily",
            None,
        );
        let mut d = date("2024-03-01");
        while d <= date("2024-03-31") {
            assert!(applies_on_date(&s, d), "daily should apply on {}", d);
            d = d.succ_opt().unwrap();
        }
        assert!(!applies_on_date(&s, date("2024-02-29")));
        assert!(!applies_on_date(&s, date("2024-04-01")));
    }

    #[test]
    fn test_daily_open_ended_range() {
        let s = schedule("2024-03-01", None, "08:00:00", "20:00:00", "daily", None);
        assert!(applies_on_date(&s, date("2030-12-25")));
    }

    #[test]
    fn test_weekly_matches_selected_weekdays() {
        // 0=Monday, 4=Friday
        let s = schedule(
            "2024-03-01",
            None,
            "08:00:00",
            "20:00:00",
            "weekly",
            Some("0,4"),
        );
        // 2024-03-04 is a Monday, 2024-03-08 a Friday, 2024-03-06 a Wednesday
        assert!(applies_on_date(&s, date("2024-03-04")));
        assert!(applies_on_date(&s, date("2024-03-08")));
        assert!(!applies_on_date(&s, date("2024-03-06")));
    }

    #[test]
    fn test_weekly_with_empty_days_never_applies() {
        let s = schedule("2024-03-01", None, "08:00:00", "20:00:00", "weekly", None);
        assert!(!applies_on_date(&s, date("2024-03-04")));

        let s = schedule(
            "2024-03-01",
            None,
            "08:00:00",
            "20:00:00",
            "weekly",
            Some(""),
        );
        assert!(!applies_on_date(&s, date("2024-03-04")));
    }

    #[test]
    fn test_monthly_plain_day_of_month() {
        let s = schedule("2024-01-15", None, "08:00:00", "20:00:00", "monthly", None);
        assert!(applies_on_date(&s, date("2024-02-15")));
        assert!(applies_on_date(&s, date("2024-03-15")));
        assert!(!applies_on_date(&s, date("2024-02-14")));
    }

    #[test]
    fn test_monthly_last_day_rule() {
        let s = schedule("2024-01-31", None, "08:00:00", "20:00:00", "monthly", None);
        assert!(applies_on_date(&s, date("2024-02-29")));
        assert!(applies_on_date(&s, date("2024-03-31")));
        assert!(applies_on_date(&s, date("2024-04-30")));
        assert!(!applies_on_date(&s, date("2024-02-15")));
        // 2025 is not a leap year
        assert!(applies_on_date(&s, date("2025-02-28")));
    }

    #[test]
    fn test_monthly_day_28_anchor_not_last_day() {
        // Feb 2023 ends on the 28th but a Jan 28 anchor is not the last day
        // of January, so it stays a plain day-of-month match.
        let s = schedule("2023-01-28", None, "08:00:00", "20:00:00", "monthly", None);
        assert!(applies_on_date(&s, date("2023-02-28")));
        assert!(applies_on_date(&s, date("2023-03-28")));
        assert!(!applies_on_date(&s, date("2023-03-31")));
    }

    #[test]
    fn test_custom_repeat_is_never_applicable() {
        let s = schedule("2024-03-01", None, "08:00:00", "20:00:00", "custom", None);
        assert!(!applies_on_date(&s, date("2024-03-01")));
    }

    #[test]
    fn test_unknown_repeat_type_is_never_applicable() {
        let s = schedule("2024-03-01", None, "08:00:00", "20:00:00", "hourly", None);
        assert!(!applies_on_date(&s, date("2024-03-01")));
    }

    #[test]
    fn test_daytime_window_inclusive_bounds() {
        let s = schedule("2024-03-01", None, "08:00:00", "20:00:00", "daily", None);
        assert!(active_at_time(&s, time("08:00:00")));
        assert!(active_at_time(&s, time("20:00:00")));
        assert!(active_at_time(&s, time("12:30:00")));
        assert!(!active_at_time(&s, time("07:59:59")));
        assert!(!active_at_time(&s, time("20:00:01")));
    }

    #[test]
    fn test_overnight_window_spans_midnight() {
        let s = schedule("2024-03-01", None, "22:00:00", "06:00:00", "daily", None);
        assert!(active_at_time(&s, time("22:00:00")));
        assert!(active_at_time(&s, time("06:00:00")));
        assert!(active_at_time(&s, time("00:00:00")));
        assert!(active_at_time(&s, time("23:59:59")));
        // Midpoint of the closed gap (06:00 -> 22:00)
        assert!(!active_at_time(&s, time("14:00:00")));
    }

    #[test]
    fn test_is_live_requires_all_three_conditions() {
        let mut s = schedule(
            "2024-03-01",
            Some("2024-03-31"),
            "08:00:00",
            "20:00:00",
            "daily",
            None,
        );
        let now = NaiveDateTime::parse_from_str("2024-03-15 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert!(is_live(&s, now));

        s.is_active = false;
        assert!(!is_live(&s, now));
        s.is_active = true;

        let after_hours = NaiveDateTime::parse_from_str("2024-03-15 21:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert!(!is_live(&s, after_hours));

        let out_of_range = NaiveDateTime::parse_from_str("2024-04-01 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert!(!is_live(&s, out_of_range));
    }

    #[test]
    fn test_resolve_priorities_keeps_maximum() {
        let priorities = resolve_priorities(vec![(1, 3), (1, 7), (2, 5), (1, 4)]);
        assert_eq!(priorities.get(&1), Some(&7));
        assert_eq!(priorities.get(&2), Some(&5));
        assert_eq!(priorities.get(&3), None);
    }
}
