use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("database init failed: {0}")]
    Init(String),
    #[error("migration {name} failed: {source}")]
    Migration {
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
}
