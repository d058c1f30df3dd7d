use std::path::PathBuf;

const DEFAULT_SRS_QUEUE_CAPACITY: usize = 256;
const DEFAULT_SRS_MAX_RETRY: u32 = 3;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub log_level: String,
    pub srs_queue_capacity: usize,
    pub srs_max_retry: u32,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let database_path = std::env::var("ENGINE_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_database_path());

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let srs_queue_capacity = parse_queue_capacity(std::env::var("SRS_QUEUE_CAPACITY").ok());
        let srs_max_retry = parse_max_retry(std::env::var("SRS_MAX_RETRY").ok());

        Self {
            database_path,
            log_level,
            srs_queue_capacity,
            srs_max_retry,
        }
    }

    pub fn with_database_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            log_level: "info".to_string(),
            srs_queue_capacity: DEFAULT_SRS_QUEUE_CAPACITY,
            srs_max_retry: DEFAULT_SRS_MAX_RETRY,
        }
    }
}

fn parse_queue_capacity(raw: Option<String>) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .filter(|capacity| *capacity > 0)
        .unwrap_or(DEFAULT_SRS_QUEUE_CAPACITY)
}

fn parse_max_retry(raw: Option<String>) -> u32 {
    raw.and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(DEFAULT_SRS_MAX_RETRY)
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bloomclimber")
        .join("engine.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_settings_fall_back_on_bad_values() {
        assert_eq!(
            parse_queue_capacity(Some("0".into())),
            DEFAULT_SRS_QUEUE_CAPACITY
        );
        assert_eq!(
            parse_queue_capacity(Some("not-a-number".into())),
            DEFAULT_SRS_QUEUE_CAPACITY
        );
        assert_eq!(parse_queue_capacity(None), DEFAULT_SRS_QUEUE_CAPACITY);
        assert_eq!(parse_queue_capacity(Some("32".into())), 32);

        assert_eq!(parse_max_retry(Some("-1".into())), DEFAULT_SRS_MAX_RETRY);
        assert_eq!(parse_max_retry(None), DEFAULT_SRS_MAX_RETRY);
        assert_eq!(parse_max_retry(Some("5".into())), 5);
    }
}
