pub mod jobs_api;
pub mod materials_api;
pub mod player_api;
pub mod schedules_api;
pub mod stands_api;
pub mod stores_api;
pub mod system_api;

use crate::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        // Player-facing endpoints
        .route(
            "/player/stands/:id/playlist",
            get(player_api::get_stand_playlist),
        )
        .route("/player/status", post(player_api::report_player_status))
        .route(
            "/player/stands/:id/status",
            get(player_api::get_player_status),
        )
        // Stores and departments
        .route("/stores", get(stores_api::list_stores))
        .route("/stores", post(stores_api::create_store))
        .route("/stores/:id", put(stores_api::update_store))
        .route("/stores/:id", delete(stores_api::delete_store))
        .route(
            "/stores/:id/departments",
            get(stores_api::list_departments),
        )
        .route(
            "/stores/:id/departments",
            post(stores_api::create_department),
        )
        .route("/departments/:id", put(stores_api::update_department))
        .route("/departments/:id", delete(stores_api::delete_department))
        // Stands
        .route("/stands", get(stands_api::list_stands))
        .route("/stands", post(stands_api::create_stand))
        .route("/stands/:id", get(stands_api::get_stand))
        .route("/stands/:id", put(stands_api::update_stand))
        .route("/stands/:id", delete(stands_api::delete_stand))
        .route(
            "/stands/:id/materials/order",
            put(stands_api::update_material_order),
        )
        // Materials
        .route("/stands/:id/materials", get(materials_api::list_materials))
        .route(
            "/stands/:id/materials",
            post(materials_api::create_material),
        )
        .route("/materials/:id", put(materials_api::update_material))
        .route("/materials/:id", delete(materials_api::delete_material))
        // Emission schedules
        .route("/schedules", get(schedules_api::list_schedules))
        .route("/schedules", post(schedules_api::create_schedule))
        .route("/schedules/:id", get(schedules_api::get_schedule))
        .route("/schedules/:id", put(schedules_api::update_schedule))
        .route("/schedules/:id", delete(schedules_api::delete_schedule))
        .route(
            "/schedules/:id/materials",
            get(schedules_api::get_schedule_materials),
        )
        .route(
            "/schedules/:id/materials",
            put(schedules_api::set_schedule_materials),
        )
        // Job triggers
        .route("/jobs/status-sync", post(jobs_api::trigger_status_sync))
        .route("/jobs/cleanup", post(jobs_api::trigger_cleanup))
        // System
        .route("/system/info", get(system_api::get_system_info))
}
