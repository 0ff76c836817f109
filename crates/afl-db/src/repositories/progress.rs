use afl_progress::{ProgressKey, ProgressStats};
use sqlx::{Executor, Postgres, types::Json};

pub async fn find_stats<'e, E>(
    executor: E,
    key: &ProgressKey,
) -> Result<Option<ProgressStats>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let stats: Option<Json<ProgressStats>> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT stats
            FROM practice_progress
            WHERE learner_id = $1 AND language_id = $2
        "#,
    )
    .bind(&key.learner_id)
    .bind(&key.language_id)
    .fetch_optional(executor)
    .await?;
    Ok(stats.map(|Json(stats)| stats))
}

/// Make sure a row exists for `key` so it can be locked, without touching existing data.
pub async fn ensure_record<'e, E>(executor: E, key: &ProgressKey) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO practice_progress (learner_id, language_id, stats)
            VALUES ($1, $2, $3)
            ON CONFLICT (learner_id, language_id) DO NOTHING
        "#,
    )
    .bind(&key.learner_id)
    .bind(&key.language_id)
    .bind(Json(ProgressStats::default()))
    .execute(executor)
    .await?;
    Ok(())
}

/// Read the stats for `key` and hold a row lock until the transaction ends.
///
/// Must run inside a transaction, after [`ensure_record`].
pub async fn lock_stats<'e, E>(executor: E, key: &ProgressKey) -> Result<ProgressStats, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let Json(stats): Json<ProgressStats> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT stats
            FROM practice_progress
            WHERE learner_id = $1 AND language_id = $2
            FOR UPDATE
        "#,
    )
    .bind(&key.learner_id)
    .bind(&key.language_id)
    .fetch_one(executor)
    .await?;
    Ok(stats)
}

pub async fn upsert_stats<'e, E>(
    executor: E,
    key: &ProgressKey,
    stats: &ProgressStats,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO practice_progress (learner_id, language_id, stats)
            VALUES ($1, $2, $3)
            ON CONFLICT (learner_id, language_id)
            DO UPDATE SET
                stats = $3,
                updated_at = NOW()
        "#,
    )
    .bind(&key.learner_id)
    .bind(&key.language_id)
    .bind(Json(stats))
    .execute(executor)
    .await?;
    Ok(())
}
