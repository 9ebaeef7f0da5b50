use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Basic deployment facts for the dashboard and player clients.
pub async fn get_system_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "Reklamo Server",
        "version": env!("CARGO_PKG_VERSION"),
        "timezone": state.config.scheduler.timezone,
        "sync_interval_secs": state.config.scheduler.sync_interval_secs,
    }))
}
