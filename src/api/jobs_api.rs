use crate::services::cleanup_service;
use crate::services::status_sync::{self, StatusSyncReport};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::path::PathBuf;

/// Manual trigger for the status synchronization job, sharing the advisory
/// guard with the periodic loop. A run already in flight is refused rather
/// than queued; the caller can simply retry.
pub async fn trigger_status_sync(
    State(state): State<AppState>,
) -> Result<Json<StatusSyncReport>, StatusCode> {
    let Ok(_guard) = state.sync_guard.try_lock() else {
        return Err(StatusCode::CONFLICT);
    };

    let tz = state
        .config
        .timezone()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let now = chrono::Utc::now().with_timezone(&tz).naive_local();

    let pool = state.db.clone();
    let report = tokio::task::spawn_blocking(move || -> anyhow::Result<StatusSyncReport> {
        let mut conn = pool.get()?;
        status_sync::run_status_sync(&mut conn, now)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(|e| {
        tracing::error!("Manual status sync failed: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(report))
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub materials_deleted: Vec<i32>,
}

pub async fn trigger_cleanup(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, StatusCode> {
    let tz = state
        .config
        .timezone()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let now = chrono::Utc::now().with_timezone(&tz).naive_local();

    let pool = state.db.clone();
    let media_root = PathBuf::from(state.config.media_path());
    let deleted = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<i32>> {
        let mut conn = pool.get()?;
        cleanup_service::cleanup_expired_materials(&mut conn, &media_root, now)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(|e| {
        tracing::error!("Manual cleanup failed: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(CleanupResponse {
        materials_deleted: deleted,
    }))
}
