use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, SqlitePool};
use uuid::Uuid;

/// One row per learner and topic, created lazily on first contact. Carries
/// the Bloom climber state and the forgetting-curve scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub id: String,
    pub learner_id: i64,
    pub topic_slug: String,
    pub current_bloom_level: i32,
    pub unlocked_bloom_level: i32,
    pub current_streak: i32,
    pub level_correct_count: i32,
    pub consecutive_wrong: i32,
    pub total_answered: i64,
    pub correct_answered: i64,
    pub mastery_score: i64,
    pub stability: f64,
    pub retention_score: i64,
    pub last_studied_at: Option<i64>,
}

/// One row per learner and question: the Leitner box the spaced-repetition
/// scheduler operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionProgress {
    pub id: String,
    pub learner_id: i64,
    pub question_id: i64,
    pub box_level: i32,
    pub consecutive_correct: i32,
    pub mastered: bool,
    pub next_review_at: Option<i64>,
    pub last_answered_at: Option<i64>,
}

impl QuestionProgress {
    pub fn new(learner_id: i64, question_id: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            learner_id,
            question_id,
            box_level: 0,
            consecutive_correct: 0,
            mastered: false,
            next_review_at: None,
            last_answered_at: None,
        }
    }
}

#[derive(Clone)]
pub struct ProgressStore {
    pool: SqlitePool,
}

impl ProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Idempotent first-touch initialization. INSERT OR IGNORE means two
    /// concurrent first requests for the same learner/topic cannot create
    /// duplicate rows.
    pub async fn get_or_create_topic_progress(
        &self,
        learner_id: i64,
        topic_slug: &str,
        now_ms: i64,
    ) -> Result<TopicProgress, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO "learner_topic_progress"
                ("id", "learner_id", "topic_slug", "created_at", "updated_at")
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(learner_id)
        .bind(topic_slug)
        .bind(now_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r#"
            SELECT "id", "learner_id", "topic_slug", "current_bloom_level",
                   "unlocked_bloom_level", "current_streak", "level_correct_count",
                   "consecutive_wrong", "total_answered", "correct_answered",
                   "mastery_score", "stability", "retention_score", "last_studied_at"
            FROM "learner_topic_progress"
            WHERE "learner_id" = ? AND "topic_slug" = ?
            "#,
        )
        .bind(learner_id)
        .bind(topic_slug)
        .fetch_one(&self.pool)
        .await?;

        map_topic_progress_row(&row)
    }

    pub async fn save_topic_progress(
        &self,
        progress: &TopicProgress,
        now_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE "learner_topic_progress"
            SET "current_bloom_level" = ?,
                "unlocked_bloom_level" = ?,
                "current_streak" = ?,
                "level_correct_count" = ?,
                "consecutive_wrong" = ?,
                "total_answered" = ?,
                "correct_answered" = ?,
                "mastery_score" = ?,
                "stability" = ?,
                "retention_score" = ?,
                "last_studied_at" = ?,
                "updated_at" = ?
            WHERE "id" = ?
            "#,
        )
        .bind(progress.current_bloom_level)
        .bind(progress.unlocked_bloom_level)
        .bind(progress.current_streak)
        .bind(progress.level_correct_count)
        .bind(progress.consecutive_wrong)
        .bind(progress.total_answered)
        .bind(progress.correct_answered)
        .bind(progress.mastery_score)
        .bind(progress.stability)
        .bind(progress.retention_score)
        .bind(progress.last_studied_at)
        .bind(now_ms)
        .bind(&progress.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_question_progress(
        &self,
        learner_id: i64,
        question_id: i64,
    ) -> Result<Option<QuestionProgress>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT "id", "learner_id", "question_id", "box", "consecutive_correct",
                   "mastered", "next_review_at", "last_answered_at"
            FROM "learner_question_progress"
            WHERE "learner_id" = ? AND "question_id" = ?
            "#,
        )
        .bind(learner_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| map_question_progress_row(&row)).transpose()
    }

    pub async fn upsert_question_progress(
        &self,
        progress: &QuestionProgress,
        now_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO "learner_question_progress"
                ("id", "learner_id", "question_id", "box", "consecutive_correct",
                 "mastered", "next_review_at", "last_answered_at", "updated_at")
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT("learner_id", "question_id") DO UPDATE SET
                "box" = excluded."box",
                "consecutive_correct" = excluded."consecutive_correct",
                "mastered" = excluded."mastered",
                "next_review_at" = excluded."next_review_at",
                "last_answered_at" = excluded."last_answered_at",
                "updated_at" = excluded."updated_at"
            "#,
        )
        .bind(&progress.id)
        .bind(progress.learner_id)
        .bind(progress.question_id)
        .bind(progress.box_level)
        .bind(progress.consecutive_correct)
        .bind(progress.mastered)
        .bind(progress.next_review_at)
        .bind(progress.last_answered_at)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mastered and in-progress row counts over a topic subtree, the two
    /// numerators of the weighted mastery score.
    pub async fn mastery_counts(
        &self,
        learner_id: i64,
        topic_ids: &[i64],
    ) -> Result<(i64, i64), sqlx::Error> {
        if topic_ids.is_empty() {
            return Ok((0, 0));
        }

        let mut qb = QueryBuilder::<sqlx::Sqlite>::new(
            r#"
            SELECT
                COUNT(CASE WHEN p."mastered" = 1 THEN 1 END) AS "mastered_count",
                COUNT(CASE WHEN p."mastered" = 0 AND p."consecutive_correct" > 0 THEN 1 END) AS "learning_count"
            FROM "learner_question_progress" p
            JOIN "questions" q ON q."id" = p."question_id"
            WHERE p."learner_id" = "#,
        );
        qb.push_bind(learner_id);
        qb.push(r#" AND q."topic_id" IN ("#);
        {
            let mut sep = qb.separated(", ");
            for id in topic_ids {
                sep.push_bind(id);
            }
            sep.push_unseparated(")");
        }

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok((row.try_get("mastered_count")?, row.try_get("learning_count")?))
    }

    /// How many questions at one Bloom tier of a subtree this learner has
    /// mastered. Feeds the promotion coverage check.
    pub async fn mastered_at_level(
        &self,
        learner_id: i64,
        topic_ids: &[i64],
        bloom_level: i32,
    ) -> Result<i64, sqlx::Error> {
        if topic_ids.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<sqlx::Sqlite>::new(
            r#"
            SELECT COUNT(*) AS "count"
            FROM "learner_question_progress" p
            JOIN "questions" q ON q."id" = p."question_id"
            WHERE p."learner_id" = "#,
        );
        qb.push_bind(learner_id);
        qb.push(r#" AND p."mastered" = 1 AND q."bloom_level" = "#);
        qb.push_bind(bloom_level);
        qb.push(r#" AND q."topic_id" IN ("#);
        {
            let mut sep = qb.separated(", ");
            for id in topic_ids {
                sep.push_bind(id);
            }
            sep.push_unseparated(")");
        }

        let row = qb.build().fetch_one(&self.pool).await?;
        row.try_get("count")
    }

    pub async fn record_dead_letter(
        &self,
        learner_id: i64,
        question_id: i64,
        was_correct: bool,
        error: &str,
        now_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO "srs_dead_letter"
                ("id", "learner_id", "question_id", "was_correct", "error", "failed_at")
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(learner_id)
        .bind(question_id)
        .bind(was_correct)
        .bind(error)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn dead_letter_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM "srs_dead_letter""#)
            .fetch_one(&self.pool)
            .await
    }
}

fn map_topic_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<TopicProgress, sqlx::Error> {
    Ok(TopicProgress {
        id: row.try_get("id")?,
        learner_id: row.try_get("learner_id")?,
        topic_slug: row.try_get("topic_slug")?,
        current_bloom_level: row.try_get("current_bloom_level")?,
        unlocked_bloom_level: row.try_get("unlocked_bloom_level")?,
        current_streak: row.try_get("current_streak")?,
        level_correct_count: row.try_get("level_correct_count")?,
        consecutive_wrong: row.try_get("consecutive_wrong")?,
        total_answered: row.try_get("total_answered")?,
        correct_answered: row.try_get("correct_answered")?,
        mastery_score: row.try_get("mastery_score")?,
        stability: row.try_get("stability")?,
        retention_score: row.try_get("retention_score")?,
        last_studied_at: row.try_get("last_studied_at")?,
    })
}

fn map_question_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuestionProgress, sqlx::Error> {
    Ok(QuestionProgress {
        id: row.try_get("id")?,
        learner_id: row.try_get("learner_id")?,
        question_id: row.try_get("question_id")?,
        box_level: row.try_get("box")?,
        consecutive_correct: row.try_get("consecutive_correct")?,
        mastered: row.try_get::<i64, _>("mastered")? != 0,
        next_review_at: row.try_get("next_review_at")?,
        last_answered_at: row.try_get("last_answered_at")?,
    })
}
