//! Hard deletion of expired materials.
//!
//! Separate mechanism from the status sync: `expires_at` removes the row and
//! its media file outright, while schedules only flip `status`. Both are kept
//! independent on purpose.

use anyhow::Result;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::interval;

use crate::models::Material;
use crate::AppState;

pub async fn run(state: AppState) {
    let tz = match state.config.timezone() {
        Ok(tz) => tz,
        Err(e) => {
            tracing::error!("Material cleanup disabled: {}", e);
            return;
        }
    };

    let mut tick = interval(Duration::from_secs(
        state.config.scheduler.cleanup_interval_secs,
    ));

    loop {
        tick.tick().await;

        let pool = state.db.clone();
        let media_root = PathBuf::from(state.config.media_path());
        let now = chrono::Utc::now().with_timezone(&tz).naive_local();

        let result = tokio::task::spawn_blocking(move || -> Result<Vec<i32>> {
            let mut conn = pool.get()?;
            cleanup_expired_materials(&mut conn, &media_root, now)
        })
        .await;

        match result {
            Ok(Ok(deleted)) if !deleted.is_empty() => {
                tracing::info!("Cleanup: removed {} expired materials", deleted.len());
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!("Material cleanup failed: {:#}", e),
            Err(e) => tracing::error!("Material cleanup task panic: {}", e),
        }
    }
}

/// Deletes every material whose `expires_at` lies before `now`, together
/// with its schedule associations and (best effort) its media file.
/// A failure on one material is logged and does not stop the batch.
pub fn cleanup_expired_materials(
    conn: &mut SqliteConnection,
    media_root: &Path,
    now: NaiveDateTime,
) -> Result<Vec<i32>> {
    use crate::schema::materials::dsl::*;

    let expired: Vec<Material> = materials
        .filter(expires_at.is_not_null())
        .filter(expires_at.lt(now))
        .select(Material::as_select())
        .load(conn)?;

    let mut deleted = Vec::new();

    for material in expired {
        match delete_material(conn, &material) {
            Ok(()) => {
                remove_media_file(media_root, &material.file_path);
                tracing::info!(
                    "Deleted expired material {} from stand {}",
                    material.id,
                    material.stand_id
                );
                deleted.push(material.id);
            }
            Err(e) => {
                tracing::error!("Failed to delete expired material {}: {}", material.id, e);
            }
        }
    }

    Ok(deleted)
}

fn delete_material(
    conn: &mut SqliteConnection,
    material: &Material,
) -> Result<(), diesel::result::Error> {
    use crate::schema::{material_schedules, materials};

    conn.transaction(|conn| {
        diesel::delete(
            material_schedules::table.filter(material_schedules::material_id.eq(material.id)),
        )
        .execute(conn)?;
        diesel::delete(materials::table.filter(materials::id.eq(material.id))).execute(conn)?;
        Ok(())
    })
}

fn remove_media_file(media_root: &Path, relative_path: &str) {
    let path = media_root.join(relative_path);
    if !path.is_file() {
        return;
    }
    if let Err(e) = std::fs::remove_file(&path) {
        tracing::warn!("Could not remove media file {:?}: {}", path, e);
    }
}
