use shared::models::{Feedback, FeedbackCreate};
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;

const FEEDBACK_COLUMNS: &str = "id, venue_id, order_id, rating, comment, created_at";

/// Store customer feedback. An `order_id` from another venue is dropped
/// rather than linked.
pub async fn create(
    pool: &PgPool,
    venue_id: i64,
    data: &FeedbackCreate,
) -> Result<Feedback, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        r#"
        INSERT INTO feedback (id, venue_id, order_id, rating, comment, created_at)
        VALUES ($1, $2, (SELECT id FROM orders WHERE id = $3 AND venue_id = $2), $4, $5, $6)
        RETURNING {FEEDBACK_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(venue_id)
    .bind(data.order_id)
    .bind(data.rating)
    .bind(data.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()))
    .bind(now_millis())
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool, venue_id: i64, limit: i64, offset: i64) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE venue_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(venue_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
