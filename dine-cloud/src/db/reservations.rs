use shared::error::{AppError, ErrorCode};
use shared::models::{Reservation, ReservationCreate, ReservationStatus};
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;

use crate::error::ServiceResult;

const RESERVATION_COLUMNS: &str = "id, venue_id, table_id, guest_name, phone, party_size, starts_at, status, notes, created_at, updated_at";
const DAY_MS: i64 = 86_400_000;

/// Reservations starting within `[day_start, day_start + 1 day)`
pub async fn list_for_day(
    pool: &PgPool,
    venue_id: i64,
    day_start: i64,
    status: Option<ReservationStatus>,
) -> Result<Vec<Reservation>, sqlx::Error> {
    sqlx::query_as::<_, Reservation>(&format!(
        r#"
        SELECT {RESERVATION_COLUMNS} FROM reservations
        WHERE venue_id = $1 AND starts_at >= $2 AND starts_at < $3
          AND ($4::TEXT IS NULL OR status = $4)
        ORDER BY starts_at
        "#
    ))
    .bind(venue_id)
    .bind(day_start)
    .bind(day_start + DAY_MS)
    .bind(status)
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    venue_id: i64,
    data: &ReservationCreate,
) -> ServiceResult<Reservation> {
    if let Some(table_id) = data.table_id
        && super::tables::find(pool, venue_id, table_id).await?.is_none()
    {
        return Err(super::tables::table_not_found(table_id).into());
    }

    let now = now_millis();
    let reservation = sqlx::query_as::<_, Reservation>(&format!(
        r#"
        INSERT INTO reservations (id, venue_id, table_id, guest_name, phone, party_size, starts_at,
                                  status, notes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING {RESERVATION_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(venue_id)
    .bind(data.table_id)
    .bind(data.guest_name.trim())
    .bind(data.phone.as_deref())
    .bind(data.party_size)
    .bind(data.starts_at)
    .bind(ReservationStatus::Booked)
    .bind(data.notes.as_deref())
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(reservation)
}

pub async fn change_status(
    pool: &PgPool,
    venue_id: i64,
    reservation_id: i64,
    to: ReservationStatus,
) -> ServiceResult<Reservation> {
    let mut tx = pool.begin().await?;
    let current: Option<(ReservationStatus,)> = sqlx::query_as(
        "SELECT status FROM reservations WHERE id = $1 AND venue_id = $2 FOR UPDATE",
    )
    .bind(reservation_id)
    .bind(venue_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (from,) = current.ok_or_else(|| {
        AppError::with_message(ErrorCode::ReservationNotFound, "Reservation not found")
            .with_detail("reservation_id", reservation_id)
    })?;
    if !from.can_transition_to(to) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot move reservation from {from} to {to}"),
        )
        .into());
    }

    let reservation = sqlx::query_as::<_, Reservation>(&format!(
        "UPDATE reservations SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {RESERVATION_COLUMNS}"
    ))
    .bind(reservation_id)
    .bind(to)
    .bind(now_millis())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(reservation)
}
