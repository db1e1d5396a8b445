pub mod models;
pub mod test_utils;

use sea_orm::{Database, DatabaseConnection, DbErr};
use std::path::Path;
use util::config;

/// Connects to the configured database.
///
/// `DATABASE_PATH` may be a full DSN or a plain SQLite file path; for the
/// latter the parent directory is created and `mode=rwc` is appended.
pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let path_or_url = config::database_path();
    let url = if path_or_url.starts_with("sqlite:") || path_or_url.starts_with("postgres://") {
        path_or_url
    } else {
        if let Some(parent) = Path::new(&path_or_url).parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(error = %e, dir = %parent.display(), "Failed to create database directory");
            }
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    tracing::info!(url = %url, "Connecting to database");
    Database::connect(&url).await
}
