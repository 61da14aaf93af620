use shared::error::{AppError, ErrorCode};
use shared::models::{Venue, VenueCreate, VenueSummary, VenueUpdate};
use shared::staff::VenueRole;
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;

use crate::error::{ServiceResult, map_unique};

const VENUE_COLUMNS: &str = "id, organization_id, name, slug, currency, timezone, reset_hour_utc, is_active, created_at, updated_at";

/// Venues the user holds any role in
pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<VenueSummary>, sqlx::Error> {
    sqlx::query_as::<_, VenueSummary>(
        r#"
        SELECT v.id, v.name, v.slug, r.role, v.is_active
        FROM venues v
        JOIN user_venue_roles r ON r.venue_id = v.id
        WHERE r.user_id = $1
        ORDER BY v.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, venue_id: i64) -> Result<Option<Venue>, sqlx::Error> {
    sqlx::query_as::<_, Venue>(&format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1"))
        .bind(venue_id)
        .fetch_optional(pool)
        .await
}

/// Active venue for public (customer) routes; inactive venues look absent
pub async fn find_active(pool: &PgPool, venue_id: i64) -> Result<Option<Venue>, sqlx::Error> {
    sqlx::query_as::<_, Venue>(&format!(
        "SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1 AND is_active"
    ))
    .bind(venue_id)
    .fetch_optional(pool)
    .await
}

/// Create a venue (and its organization when none is given); the caller becomes OWNER
pub async fn create(
    pool: &PgPool,
    user_id: &str,
    email: Option<&str>,
    data: &VenueCreate,
) -> ServiceResult<Venue> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let organization_id = match data.organization_id {
        Some(org_id) => {
            let owned: Option<(i64,)> = sqlx::query_as(
                "SELECT id FROM organizations WHERE id = $1 AND owner_user_id = $2",
            )
            .bind(org_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
            owned
                .ok_or_else(|| {
                    AppError::with_message(ErrorCode::OrganizationNotFound, "Organization not found")
                        .with_detail("organization_id", org_id)
                })?
                .0
        }
        None => {
            let org_id = snowflake_id();
            sqlx::query(
                "INSERT INTO organizations (id, name, owner_user_id, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(org_id)
            .bind(&data.name)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            org_id
        }
    };

    let venue = sqlx::query_as::<_, Venue>(&format!(
        r#"
        INSERT INTO venues (id, organization_id, name, slug, currency, timezone, reset_hour_utc,
                            is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $8)
        RETURNING {VENUE_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(organization_id)
    .bind(&data.name)
    .bind(data.slug.to_lowercase())
    .bind(
        data.currency
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "usd".to_string()),
    )
    .bind(data.timezone.as_deref().unwrap_or("UTC"))
    .bind(data.reset_hour_utc.unwrap_or(4))
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        map_unique(
            e,
            "venues_slug_key",
            AppError::with_message(ErrorCode::AlreadyExists, "Slug already taken")
                .with_detail("slug", data.slug.clone()),
        )
    })?;

    sqlx::query(
        r#"
        INSERT INTO user_venue_roles (venue_id, user_id, email, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        "#,
    )
    .bind(venue.id)
    .bind(user_id)
    .bind(email)
    .bind(VenueRole::Owner)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(venue)
}

pub async fn update(
    pool: &PgPool,
    venue_id: i64,
    data: &VenueUpdate,
) -> Result<Option<Venue>, sqlx::Error> {
    sqlx::query_as::<_, Venue>(&format!(
        r#"
        UPDATE venues SET
            name = COALESCE($2, name),
            currency = COALESCE(lower($3), currency),
            timezone = COALESCE($4, timezone),
            reset_hour_utc = COALESCE($5, reset_hour_utc),
            is_active = COALESCE($6, is_active),
            updated_at = $7
        WHERE id = $1
        RETURNING {VENUE_COLUMNS}
        "#
    ))
    .bind(venue_id)
    .bind(data.name.as_deref())
    .bind(data.currency.as_deref())
    .bind(data.timezone.as_deref())
    .bind(data.reset_hour_utc)
    .bind(data.is_active)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

/// Active venues past their reset hour with no reset logged for `reset_date`
pub async fn due_for_reset(
    pool: &PgPool,
    hour_utc: i32,
    reset_date: &str,
) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT v.id FROM venues v
        WHERE v.is_active
          AND v.reset_hour_utc <= $1
          AND NOT EXISTS (
              SELECT 1 FROM daily_reset_log l
              WHERE l.venue_id = v.id AND l.reset_date = $2
          )
        ORDER BY v.id
        "#,
    )
    .bind(hour_utc)
    .bind(reset_date)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
