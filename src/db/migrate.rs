use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::EngineError;

/// Ordered migration list. Names are recorded in `_migrations` so each file
/// runs exactly once per database.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_init_schema",
        include_str!("../../sql/001_init_schema.sql"),
    ),
    (
        "002_level_correct_count",
        include_str!("../../sql/002_level_correct_count.sql"),
    ),
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" INTEGER PRIMARY KEY AUTOINCREMENT,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> = sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
        .fetch_all(pool)
        .await?;

    for &(name, sql) in MIGRATIONS {
        if applied.iter().any(|done| done == name) {
            continue;
        }

        tracing::info!(migration = name, "applying migration");

        for stmt in split_sql_statements(sql) {
            sqlx::query(&stmt)
                .execute(pool)
                .await
                .map_err(|source| EngineError::Migration { name, source })?;
        }

        sqlx::query(r#"INSERT INTO "_migrations" ("name", "applied_at") VALUES (?, ?)"#)
            .bind(name)
            .bind(Utc::now().timestamp_millis())
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Splits a migration file into single statements, ignoring semicolons inside
/// quoted strings and stripping comment-only lines.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ';' if !in_single_quote && !in_double_quote => {
                push_statement(&mut statements, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let sql: String = raw
        .lines()
        .filter(|line| !line.trim().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = sql.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_statements_and_drops_comments() {
        let sql = "-- header\nCREATE TABLE \"a\" (\"x\" TEXT);\nINSERT INTO \"a\" VALUES ('semi;colon');";
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE TABLE"));
        assert!(stmts[1].contains("semi;colon"));
    }
}
