use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::time::Duration;
use tokio::time::interval;

use crate::AppState;

/// A player that has not reported for this long is considered offline.
const OFFLINE_AFTER_SECS: i64 = 300;

pub async fn run(state: AppState) {
    let mut tick = interval(Duration::from_secs(60));

    loop {
        tick.tick().await;

        let mut conn = match state.db.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Player monitor could not get DB connection: {}", e);
                continue;
            }
        };

        // Heartbeats are wall-clock bookkeeping, not schedule evaluation,
        // so plain UTC is fine here.
        match mark_stale_players_offline(&mut conn, chrono::Utc::now().naive_utc()) {
            Ok(count) if count > 0 => {
                tracing::warn!("Marked {} unresponsive players as offline", count);
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Player monitor error: {}", e),
        }
    }
}

pub fn mark_stale_players_offline(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::player_statuses::dsl::*;

    let threshold = now - chrono::Duration::seconds(OFFLINE_AFTER_SECS);

    diesel::update(
        player_statuses
            .filter(is_online.eq(true))
            .filter(last_seen.lt(threshold)),
    )
    .set(is_online.eq(false))
    .execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPlayerStatus;
    use crate::services::test_support::*;

    fn seed_player(conn: &mut SqliteConnection, stand_id: i32, last: NaiveDateTime) {
        use crate::schema::player_statuses;

        diesel::insert_into(player_statuses::table)
            .values(&NewPlayerStatus {
                stand_id,
                is_online: true,
                last_seen: Some(last),
                ip_address: None,
                user_agent: None,
                screen_resolution: None,
                version: None,
                errors: None,
            })
            .execute(conn)
            .unwrap();
    }

    #[test]
    fn test_stale_player_goes_offline_fresh_one_stays() {
        let mut conn = test_conn();
        let target_stand = seed_stand(&mut conn);
        seed_player(&mut conn, target_stand, dt("2024-03-15 11:00:00"));

        let count =
            mark_stale_players_offline(&mut conn, dt("2024-03-15 12:00:00")).unwrap();
        assert_eq!(count, 1);

        // Reporting again within the threshold keeps the player online.
        use crate::schema::player_statuses::dsl::*;
        diesel::update(player_statuses.filter(stand_id.eq(target_stand)))
            .set((is_online.eq(true), last_seen.eq(Some(dt("2024-03-15 11:59:00")))))
            .execute(&mut conn)
            .unwrap();
        let count =
            mark_stale_players_offline(&mut conn, dt("2024-03-15 12:00:00")).unwrap();
        assert_eq!(count, 0);
    }
}
