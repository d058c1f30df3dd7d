pub mod migrate;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::EngineError;

/// Opens (creating if missing) the engine database and brings the schema up
/// to date. WAL mode keeps the selector's reads from stalling behind the
/// worker's writes.
pub async fn init_pool(db_path: &Path) -> Result<SqlitePool, EngineError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::Init(e.to_string()))?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)
        .map_err(|e| EngineError::Init(e.to_string()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate::run_migrations(&pool).await?;

    Ok(pool)
}
