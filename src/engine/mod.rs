//! Engine facade: the two operations the question-serving layer calls, plus
//! the readiness summary. Orchestrates the selector, the Bloom climber, the
//! SRS queue and the mastery scorer over one SQLite pool.

pub mod bloom;
pub mod mastery;
pub mod retention;
mod selector;
pub mod srs;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

pub use bloom::ProgressEvent;

use crate::config::EngineConfig;
use crate::content::{ContentStore, Question};
use crate::db;
use crate::error::EngineError;
use crate::progress::ProgressStore;
use crate::workers::SrsWriter;

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestion {
    pub question: Question,
    pub is_review: bool,
    pub mastery_score: i64,
    pub streak: i32,
    pub streak_progress: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub new_level: i32,
    pub streak: i32,
    pub level_correct_count: i32,
    pub streak_progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<ProgressEvent>,
    pub mastered_count: i64,
    pub mastery_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub topic_slug: String,
    pub current_bloom_level: i32,
    pub unlocked_bloom_level: i32,
    pub mastery_score: i64,
    pub retention_score: i64,
    pub readiness: i64,
    pub stability: f64,
    pub total_answered: i64,
    pub correct_answered: i64,
    pub last_studied_at: Option<i64>,
}

pub struct Engine {
    pool: SqlitePool,
    content: ContentStore,
    progress: ProgressStore,
    srs_writer: SrsWriter,
}

impl Engine {
    pub async fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let pool = db::init_pool(&config.database_path).await?;
        Ok(Self::new(pool, config))
    }

    /// Wires the engine over an already-migrated pool.
    pub fn new(pool: SqlitePool, config: &EngineConfig) -> Self {
        let progress = ProgressStore::new(pool.clone());
        let srs_writer = SrsWriter::spawn(
            progress.clone(),
            config.srs_queue_capacity,
            config.srs_max_retry,
        );
        Self {
            content: ContentStore::new(pool.clone()),
            progress,
            srs_writer,
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Picks the next question to serve. `excluded` is the caller's
    /// already-served-this-session set; `level_override` narrows the pick to
    /// one exact Bloom tier for predictive pre-fetching. `None` means the
    /// subtree has nothing active to offer.
    pub async fn next_question(
        &self,
        learner_id: i64,
        topic_slug: &str,
        excluded: &[i64],
        level_override: Option<i32>,
    ) -> Result<Option<NextQuestion>, EngineError> {
        let now = Utc::now();
        let topic_ids = self.content.resolve_subtopics(topic_slug).await?;
        if topic_ids.is_empty() {
            tracing::debug!(topic_slug, "no such topic, nothing to serve");
            return Ok(None);
        }

        let progress = self
            .progress
            .get_or_create_topic_progress(learner_id, topic_slug, now.timestamp_millis())
            .await?;

        let picked = selector::pick_question(
            &self.pool,
            learner_id,
            &topic_ids,
            excluded,
            progress.current_bloom_level,
            level_override,
            now.timestamp_millis(),
        )
        .await?;

        Ok(picked.map(|picked| NextQuestion {
            question: picked.question,
            is_review: picked.is_review,
            mastery_score: progress.mastery_score,
            streak: progress.current_streak,
            streak_progress: bloom::streak_progress(progress.level_correct_count),
        }))
    }

    /// Applies one answer: the Leitner update goes to the write queue, the
    /// topic row (climber state, forgetting-curve scalars, mastery, counters)
    /// is updated on the response path.
    pub async fn record_answer(
        &self,
        learner_id: i64,
        topic_slug: &str,
        question_id: i64,
        was_correct: bool,
        question_bloom_level: i32,
    ) -> Result<AnswerOutcome, EngineError> {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        self.srs_writer.enqueue(learner_id, question_id, was_correct);

        let topic_ids = self.content.resolve_subtopics(topic_slug).await?;
        let mut progress = self
            .progress
            .get_or_create_topic_progress(learner_id, topic_slug, now_ms)
            .await?;

        // Retention is snapshotted against the pre-answer stability, then the
        // answered question's difficulty feeds the stability update.
        let days_elapsed = progress
            .last_studied_at
            .map(|then| (now_ms - then).max(0) as f64 / MS_PER_DAY)
            .unwrap_or(0.0);
        progress.retention_score = retention::retention(days_elapsed, progress.stability);
        progress.stability =
            retention::next_stability(progress.stability, question_bloom_level, was_correct);

        let ctx = if was_correct {
            self.level_context(learner_id, &topic_ids, progress.current_bloom_level)
                .await?
        } else {
            bloom::LevelContext { coverage: 0.0, next_level_available: false }
        };

        let state = bloom::BloomState {
            current_level: progress.current_bloom_level,
            unlocked_level: progress.unlocked_bloom_level,
            streak: progress.current_streak,
            level_correct_count: progress.level_correct_count,
            consecutive_wrong: progress.consecutive_wrong,
        };
        let (state, event) = bloom::apply_answer(state, was_correct, ctx);

        if let Some(event) = event {
            match event {
                ProgressEvent::LevelUnlocked | ProgressEvent::Promotion => {
                    tracing::info!(learner_id, topic_slug, level = state.current_level, ?event, "level promotion");
                }
                ProgressEvent::Demotion => {
                    tracing::info!(learner_id, topic_slug, level = state.current_level, "level demotion");
                }
                ProgressEvent::StreakExtended => {}
            }
        }

        progress.current_bloom_level = state.current_level;
        progress.unlocked_bloom_level = state.unlocked_level;
        progress.current_streak = state.streak;
        progress.level_correct_count = state.level_correct_count;
        progress.consecutive_wrong = state.consecutive_wrong;
        progress.total_answered += 1;
        if was_correct {
            progress.correct_answered += 1;
        }

        let (mastered_count, learning_count) =
            self.progress.mastery_counts(learner_id, &topic_ids).await?;
        let total_questions = self.content.count_active_questions(&topic_ids, None).await?;
        progress.mastery_score =
            mastery::weighted_mastery(mastered_count, learning_count, total_questions);

        progress.last_studied_at = Some(now_ms);
        self.progress.save_topic_progress(&progress, now_ms).await?;

        Ok(AnswerOutcome {
            new_level: progress.current_bloom_level,
            streak: progress.current_streak,
            level_correct_count: progress.level_correct_count,
            streak_progress: bloom::streak_progress(progress.level_correct_count),
            event,
            mastered_count,
            mastery_score: progress.mastery_score,
        })
    }

    /// On-demand decay summary: nothing recomputes retention in the
    /// background, it falls out of elapsed time whenever somebody asks.
    pub async fn topic_readiness(
        &self,
        learner_id: i64,
        topic_slug: &str,
    ) -> Result<ReadinessReport, EngineError> {
        let now_ms = Utc::now().timestamp_millis();
        let progress = self
            .progress
            .get_or_create_topic_progress(learner_id, topic_slug, now_ms)
            .await?;

        let days_elapsed = progress
            .last_studied_at
            .map(|then| (now_ms - then).max(0) as f64 / MS_PER_DAY)
            .unwrap_or(0.0);
        let retention_now = retention::retention(days_elapsed, progress.stability);

        Ok(ReadinessReport {
            topic_slug: progress.topic_slug,
            current_bloom_level: progress.current_bloom_level,
            unlocked_bloom_level: progress.unlocked_bloom_level,
            mastery_score: progress.mastery_score,
            retention_score: retention_now,
            readiness: retention::readiness(progress.mastery_score, retention_now),
            stability: progress.stability,
            total_answered: progress.total_answered,
            correct_answered: progress.correct_answered,
            last_studied_at: progress.last_studied_at,
        })
    }

    async fn level_context(
        &self,
        learner_id: i64,
        topic_ids: &[i64],
        level: i32,
    ) -> Result<bloom::LevelContext, EngineError> {
        let total_in_level = self
            .content
            .count_active_questions(topic_ids, Some(level))
            .await?;
        let mastered_in_level = self
            .progress
            .mastered_at_level(learner_id, topic_ids, level)
            .await?;

        let next_level_available = if level < bloom::MAX_LEVEL {
            self.content
                .count_active_questions(topic_ids, Some(level + 1))
                .await?
                > 0
        } else {
            false
        };

        Ok(bloom::LevelContext {
            coverage: bloom::coverage(mastered_in_level, total_in_level),
            next_level_available,
        })
    }

    /// Waits for every queued SRS write to land.
    pub async fn flush_srs(&self) {
        self.srs_writer.flush().await;
    }

    /// Drains the SRS queue and stops the worker.
    pub async fn shutdown(&self) {
        self.srs_writer.stop().await;
    }
}
