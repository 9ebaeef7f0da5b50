use crate::models::{NewPlayerStatus, PlayerStatus, Stand};
use crate::services::playlist_service::{self, PlaylistError, PlaylistEntry};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct PlaylistQuery {
    /// Override for the evaluation instant, mainly for preview and testing.
    /// Interpreted in the configured scheduler timezone.
    pub at: Option<NaiveDateTime>,
}

#[derive(Serialize)]
pub struct PlaylistResponse {
    pub stand_id: i32,
    pub display_time: i32,
    pub transition_animation: String,
    pub materials: Vec<PlaylistEntry>,
}

/// "What should this stand show right now" — the read-only query the player
/// polls. 404 for an unknown stand; an existing stand with nothing eligible
/// is a valid empty playlist.
pub async fn get_stand_playlist(
    State(state): State<AppState>,
    Path(stand_id): Path<i32>,
    Query(params): Query<PlaylistQuery>,
) -> Result<Json<PlaylistResponse>, StatusCode> {
    use crate::schema::stands;

    let tz = state
        .config
        .timezone()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let now = params
        .at
        .unwrap_or_else(|| chrono::Utc::now().with_timezone(&tz).naive_local());

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let materials = playlist_service::eligible_materials(&mut conn, stand_id, now).map_err(
        |e| match e {
            PlaylistError::StandNotFound(_) => StatusCode::NOT_FOUND,
            PlaylistError::Database(e) => {
                tracing::error!("Playlist resolution failed for stand {}: {}", stand_id, e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
    )?;

    let stand: Stand = stands::table
        .find(stand_id)
        .select(Stand::as_select())
        .first(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(PlaylistResponse {
        stand_id: stand.id,
        display_time: stand.display_time,
        transition_animation: stand.transition_animation,
        materials,
    }))
}

#[derive(Deserialize)]
pub struct PlayerReport {
    pub stand_id: i32,
    pub screen_resolution: Option<String>,
    pub version: Option<String>,
    pub errors: Option<String>,
}

/// Heartbeat from a player. Upserts the per-stand status row.
pub async fn report_player_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(report): Json<PlayerReport>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::player_statuses::dsl::*;
    use crate::schema::stands;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let stand_exists: Option<i32> = stands::table
        .find(report.stand_id)
        .select(stands::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if stand_exists.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let reported_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let now = chrono::Utc::now().naive_utc();

    let updated = diesel::update(player_statuses.filter(stand_id.eq(report.stand_id)))
        .set((
            is_online.eq(true),
            last_seen.eq(Some(now)),
            ip_address.eq(reported_ip.clone()),
            user_agent.eq(agent.clone()),
            screen_resolution.eq(report.screen_resolution.clone()),
            version.eq(report.version.clone()),
            errors.eq(report.errors.clone()),
        ))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if updated == 0 {
        diesel::insert_into(player_statuses)
            .values(&NewPlayerStatus {
                stand_id: report.stand_id,
                is_online: true,
                last_seen: Some(now),
                ip_address: reported_ip,
                user_agent: agent,
                screen_resolution: report.screen_resolution,
                version: report.version,
                errors: report.errors,
            })
            .execute(&mut conn)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct PlayerStatusResponse {
    pub is_online: bool,
    pub last_seen: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
    pub screen_resolution: Option<String>,
    pub version: Option<String>,
}

pub async fn get_player_status(
    State(state): State<AppState>,
    Path(target_stand_id): Path<i32>,
) -> Result<Json<PlayerStatusResponse>, StatusCode> {
    use crate::schema::player_statuses::dsl::*;
    use crate::schema::stands;

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

    let status: Option<PlayerStatus> = player_statuses
        .filter(stand_id.eq(target_stand_id))
        .select(PlayerStatus::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let Some(status) = status else {
        // Never reported: a valid "offline, unknown" answer, not an error.
        return Ok(Json(PlayerStatusResponse {
            is_online: false,
            last_seen: None,
            ip_address: None,
            screen_resolution: None,
            version: None,
        }));
    };

    // Lazy staleness check alongside the periodic monitor.
    let now = chrono::Utc::now().naive_utc();
    let stale = status
        .last_seen
        .map(|seen| (now - seen).num_seconds() > 300)
        .unwrap_or(true);
    if status.is_online && stale {
        diesel::update(player_statuses.filter(stand_id.eq(target_stand_id)))
            .set(is_online.eq(false))
            .execute(&mut conn)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    Ok(Json(PlayerStatusResponse {
        is_online: status.is_online && !stale,
        last_seen: status.last_seen,
        ip_address: status.ip_address,
        screen_resolution: status.screen_resolution,
        version: status.version,
    }))
}
