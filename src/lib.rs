pub mod config;
pub mod content;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod progress;
pub mod workers;

pub use config::EngineConfig;
pub use engine::{AnswerOutcome, Engine, NextQuestion, ProgressEvent, ReadinessReport};
pub use error::EngineError;
