use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, SqlitePool};

/// A node in the two-level subject/section tree. Questions hang off sections;
/// a subject request expands to all of its sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub topic_id: i64,
    pub bloom_level: i32,
    pub active: bool,
    pub prompt: String,
}

/// Read-only view over the topic/question tables. The engine never writes
/// here; authoring lives in the surrounding platform.
#[derive(Clone)]
pub struct ContentStore {
    pool: SqlitePool,
}

impl ContentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolves a slug to the topic itself plus its direct children. The tree
    /// is at most two levels deep, so one query covers the whole subtree.
    /// An unknown slug yields an empty set.
    pub async fn resolve_subtopics(&self, slug: &str) -> Result<Vec<i64>, sqlx::Error> {
        let root: Option<i64> = sqlx::query_scalar(r#"SELECT "id" FROM "topics" WHERE "slug" = ?"#)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        let Some(root_id) = root else {
            return Ok(Vec::new());
        };

        sqlx::query_scalar(r#"SELECT "id" FROM "topics" WHERE "id" = ? OR "parent_id" = ?"#)
            .bind(root_id)
            .bind(root_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count_active_questions(
        &self,
        topic_ids: &[i64],
        bloom_level: Option<i32>,
    ) -> Result<i64, sqlx::Error> {
        if topic_ids.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<sqlx::Sqlite>::new(
            r#"SELECT COUNT(*) AS "count" FROM "questions" WHERE "active" = 1 AND "topic_id" IN ("#,
        );
        {
            let mut sep = qb.separated(", ");
            for id in topic_ids {
                sep.push_bind(id);
            }
            sep.push_unseparated(")");
        }
        if let Some(level) = bloom_level {
            qb.push(r#" AND "bloom_level" = "#);
            qb.push_bind(level);
        }

        let row = qb.build().fetch_one(&self.pool).await?;
        row.try_get("count")
    }

    pub async fn get_question(&self, question_id: i64) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT "id", "topic_id", "bloom_level", "active", "prompt" FROM "questions" WHERE "id" = ?"#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| map_question_row(&row)).transpose()
    }
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, sqlx::Error> {
    Ok(Question {
        id: row.try_get("id")?,
        topic_id: row.try_get("topic_id")?,
        bloom_level: row.try_get("bloom_level")?,
        active: row.try_get::<i64, _>("active")? != 0,
        prompt: row.try_get("prompt")?,
    })
}
