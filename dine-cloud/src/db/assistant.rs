use serde_json::Value;
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;
use sqlx::types::Json;

/// Audit record of one executed assistant plan
pub struct ActionLog<'a> {
    pub venue_id: i64,
    pub user_id: &'a str,
    pub prompt: Option<&'a str>,
    pub plan: &'a Value,
    pub results: &'a Value,
    pub success: bool,
}

pub async fn log_action(pool: &PgPool, log: &ActionLog<'_>) -> Result<i64, sqlx::Error> {
    let id = snowflake_id();
    sqlx::query(
        r#"
        INSERT INTO assistant_actions (id, venue_id, user_id, prompt, plan, results, success, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(log.venue_id)
    .bind(log.user_id)
    .bind(log.prompt)
    .bind(Json(log.plan))
    .bind(Json(log.results))
    .bind(log.success)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(id)
}
