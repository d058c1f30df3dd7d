//! Question selection: a strict priority cascade over the topic subtree.
//! Due reviews first, then fresh content at the learner's current tier, then
//! a fallback over all tiers, and finally infinite practice over everything
//! already seen.

use rand::seq::IndexedRandom;
use sqlx::{QueryBuilder, Row, SqlitePool};

use crate::content::{map_question_row, Question};

/// Candidate pools are capped instead of timed out; selection cost stays
/// bounded no matter how large the topic grows.
const CANDIDATE_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub(crate) struct PickedQuestion {
    pub question: Question,
    pub is_review: bool,
}

pub(crate) async fn pick_question(
    pool: &SqlitePool,
    learner_id: i64,
    topic_ids: &[i64],
    excluded: &[i64],
    current_level: i32,
    level_override: Option<i32>,
    now_ms: i64,
) -> Result<Option<PickedQuestion>, sqlx::Error> {
    if topic_ids.is_empty() {
        return Ok(None);
    }

    // Pre-fetch probe for one exact tier: no other tier is consulted.
    if let Some(level) = level_override {
        let fresh = select_unattempted(pool, learner_id, topic_ids, excluded, Some(level)).await?;
        return Ok(choose(&fresh).map(|question| PickedQuestion { question, is_review: false }));
    }

    let due = select_due_reviews(pool, learner_id, topic_ids, excluded, now_ms).await?;
    if let Some(question) = choose_oldest_due(&due) {
        tracing::debug!(learner_id, question_id = question.id, "serving due review");
        return Ok(Some(PickedQuestion { question, is_review: true }));
    }

    let fresh = select_unattempted(pool, learner_id, topic_ids, excluded, Some(current_level)).await?;
    if let Some(question) = choose(&fresh) {
        return Ok(Some(PickedQuestion { question, is_review: false }));
    }

    let buffered = select_unattempted(pool, learner_id, topic_ids, excluded, None).await?;
    if let Some(question) = choose(&buffered) {
        return Ok(Some(PickedQuestion { question, is_review: false }));
    }

    // Infinite practice. Exclusions are honored while possible, but a fully
    // excluded subtree still serves something rather than reporting no
    // content.
    let seen = select_any_active(pool, topic_ids, excluded).await?;
    if let Some(question) = choose(&seen) {
        return Ok(Some(PickedQuestion { question, is_review: true }));
    }
    let any = select_any_active(pool, topic_ids, &[]).await?;
    Ok(choose(&any).map(|question| PickedQuestion { question, is_review: true }))
}

fn choose(candidates: &[Question]) -> Option<Question> {
    candidates.choose(&mut rand::rng()).cloned()
}

/// Oldest due timestamp wins; ties are broken randomly.
fn choose_oldest_due(candidates: &[(Question, i64)]) -> Option<Question> {
    let oldest = candidates.iter().map(|(_, due)| *due).min()?;
    let tied: Vec<&Question> = candidates
        .iter()
        .filter(|(_, due)| *due == oldest)
        .map(|(question, _)| question)
        .collect();
    tied.choose(&mut rand::rng()).map(|q| (*q).clone())
}

fn push_id_list(qb: &mut QueryBuilder<'_, sqlx::Sqlite>, ids: &[i64]) {
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")");
}

async fn select_due_reviews(
    pool: &SqlitePool,
    learner_id: i64,
    topic_ids: &[i64],
    excluded: &[i64],
    now_ms: i64,
) -> Result<Vec<(Question, i64)>, sqlx::Error> {
    let mut qb = QueryBuilder::<sqlx::Sqlite>::new(
        r#"
        SELECT q."id", q."topic_id", q."bloom_level", q."active", q."prompt",
               p."next_review_at" AS "due_at"
        FROM "questions" q
        JOIN "learner_question_progress" p
          ON p."question_id" = q."id" AND p."learner_id" = "#,
    );
    qb.push_bind(learner_id);
    qb.push(r#" WHERE q."active" = 1 AND p."next_review_at" IS NOT NULL AND p."next_review_at" <= "#);
    qb.push_bind(now_ms);
    qb.push(r#" AND q."topic_id" IN ("#);
    push_id_list(&mut qb, topic_ids);
    if !excluded.is_empty() {
        qb.push(r#" AND q."id" NOT IN ("#);
        push_id_list(&mut qb, excluded);
    }
    qb.push(r#" ORDER BY p."next_review_at" ASC LIMIT "#);
    qb.push_bind(CANDIDATE_LIMIT);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| Ok((map_question_row(row)?, row.try_get("due_at")?)))
        .collect()
}

async fn select_unattempted(
    pool: &SqlitePool,
    learner_id: i64,
    topic_ids: &[i64],
    excluded: &[i64],
    bloom_level: Option<i32>,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut qb = QueryBuilder::<sqlx::Sqlite>::new(
        r#"
        SELECT "id", "topic_id", "bloom_level", "active", "prompt"
        FROM "questions"
        WHERE "active" = 1 AND "topic_id" IN ("#,
    );
    push_id_list(&mut qb, topic_ids);
    if let Some(level) = bloom_level {
        qb.push(r#" AND "bloom_level" = "#);
        qb.push_bind(level);
    }
    qb.push(r#" AND "id" NOT IN (SELECT "question_id" FROM "learner_question_progress" WHERE "learner_id" = "#);
    qb.push_bind(learner_id);
    qb.push(")");
    if !excluded.is_empty() {
        qb.push(r#" AND "id" NOT IN ("#);
        push_id_list(&mut qb, excluded);
    }
    qb.push(" ORDER BY RANDOM() LIMIT ");
    qb.push_bind(CANDIDATE_LIMIT);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(map_question_row).collect()
}

async fn select_any_active(
    pool: &SqlitePool,
    topic_ids: &[i64],
    excluded: &[i64],
) -> Result<Vec<Question>, sqlx::Error> {
    let mut qb = QueryBuilder::<sqlx::Sqlite>::new(
        r#"
        SELECT "id", "topic_id", "bloom_level", "active", "prompt"
        FROM "questions"
        WHERE "active" = 1 AND "topic_id" IN ("#,
    );
    push_id_list(&mut qb, topic_ids);
    if !excluded.is_empty() {
        qb.push(r#" AND "id" NOT IN ("#);
        push_id_list(&mut qb, excluded);
    }
    qb.push(" ORDER BY RANDOM() LIMIT ");
    qb.push_bind(CANDIDATE_LIMIT);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(map_question_row).collect()
}
