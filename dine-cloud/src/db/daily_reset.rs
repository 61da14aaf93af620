//! End-of-day reset for one venue
//!
//! The log row is inserted first with `ON CONFLICT DO NOTHING`; a second
//! run for the same (venue, date) sees zero rows affected and changes
//! nothing, whether it comes from the scheduler or a manager.

use chrono::NaiveDate;
use shared::models::{DailyResetLog, DailyResetSummary, ResetTrigger};
use shared::order::{OrderStatus, PaymentStatus, closeout};
use shared::util::{now_millis, start_of_day_millis};
use sqlx::PgPool;

use super::orders;

const DAY_MS: i64 = 86_400_000;

/// Everything created or starting before this instant belongs to `date`
/// (or earlier): the end of `date`, but never later than `now`.
pub fn reset_cutoff(date: NaiveDate, now: i64) -> i64 {
    (start_of_day_millis(date) + DAY_MS).min(now)
}

/// The log insert claims the date; zero rows means another run already did
fn skip_if_unclaimed(claimed: u64, venue_id: i64, reset_date: &str) -> Option<DailyResetSummary> {
    (claimed == 0).then(|| DailyResetSummary::skipped(venue_id, reset_date.to_string()))
}

pub async fn run(
    pool: &PgPool,
    venue_id: i64,
    date: NaiveDate,
    trigger: ResetTrigger,
) -> Result<DailyResetSummary, sqlx::Error> {
    let reset_date = date.format("%Y-%m-%d").to_string();
    let now = now_millis();
    let cutoff = reset_cutoff(date, now);

    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        r#"
        INSERT INTO daily_reset_log (venue_id, reset_date, triggered_by, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (venue_id, reset_date) DO NOTHING
        "#,
    )
    .bind(venue_id)
    .bind(&reset_date)
    .bind(trigger)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if let Some(summary) = skip_if_unclaimed(claimed, venue_id, &reset_date) {
        tx.rollback().await?;
        tracing::debug!(venue_id, reset_date, "Daily reset already done");
        return Ok(summary);
    }

    let open_orders: Vec<(i64, OrderStatus, PaymentStatus)> = sqlx::query_as(
        r#"
        SELECT id, status, payment_status FROM orders
        WHERE venue_id = $1 AND created_at < $2 AND status NOT IN ('COMPLETED', 'CANCELLED')
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(venue_id)
    .bind(cutoff)
    .fetch_all(&mut *tx)
    .await?;
    let (orders_completed, orders_cancelled) =
        orders::apply_closeout(&mut tx, &closeout(&open_orders), now).await?;
    let (orders_completed, orders_cancelled) = (orders_completed as i64, orders_cancelled as i64);

    let tickets_bumped = sqlx::query(
        r#"
        UPDATE kds_tickets SET status = 'BUMPED', bumped_at = $3
        WHERE venue_id = $1 AND created_at < $2 AND status <> 'BUMPED'
        "#,
    )
    .bind(venue_id)
    .bind(cutoff)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected() as i64;

    let sessions_closed = sqlx::query(
        r#"
        UPDATE table_sessions SET status = 'FREE', closed_at = $3
        WHERE venue_id = $1 AND opened_at < $2 AND closed_at IS NULL
        "#,
    )
    .bind(venue_id)
    .bind(cutoff)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected() as i64;

    let reservations_no_show = sqlx::query(
        r#"
        UPDATE reservations SET status = 'NO_SHOW', updated_at = $3
        WHERE venue_id = $1 AND starts_at < $2 AND status = 'BOOKED'
        "#,
    )
    .bind(venue_id)
    .bind(cutoff)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected() as i64;

    let reservations_completed = sqlx::query(
        r#"
        UPDATE reservations SET status = 'COMPLETED', updated_at = $3
        WHERE venue_id = $1 AND starts_at < $2 AND status = 'CHECKED_IN'
        "#,
    )
    .bind(venue_id)
    .bind(cutoff)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected() as i64;

    sqlx::query(
        r#"
        UPDATE daily_reset_log SET
            orders_completed = $3, orders_cancelled = $4,
            reservations_no_show = $5, reservations_completed = $6,
            sessions_closed = $7, tickets_bumped = $8
        WHERE venue_id = $1 AND reset_date = $2
        "#,
    )
    .bind(venue_id)
    .bind(&reset_date)
    .bind(orders_completed)
    .bind(orders_cancelled)
    .bind(reservations_no_show)
    .bind(reservations_completed)
    .bind(sessions_closed)
    .bind(tickets_bumped)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let summary = DailyResetSummary {
        venue_id,
        reset_date,
        skipped: false,
        orders_completed,
        orders_cancelled,
        reservations_no_show,
        reservations_completed,
        sessions_closed,
        tickets_bumped,
    };
    tracing::info!(
        venue_id,
        reset_date = %summary.reset_date,
        trigger = %trigger,
        orders_completed,
        orders_cancelled,
        sessions_closed,
        "Daily reset complete"
    );
    Ok(summary)
}

/// Most recent reset runs of a venue
pub async fn history(pool: &PgPool, venue_id: i64, limit: i64) -> Result<Vec<DailyResetLog>, sqlx::Error> {
    sqlx::query_as::<_, DailyResetLog>(
        r#"
        SELECT venue_id, reset_date, triggered_by, orders_completed, orders_cancelled,
               reservations_no_show, reservations_completed, sessions_closed, tickets_bumped, created_at
        FROM daily_reset_log
        WHERE venue_id = $1
        ORDER BY reset_date DESC
        LIMIT $2
        "#,
    )
    .bind(venue_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_end_of_day_or_now() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let start = start_of_day_millis(date);
        // running late for a past day: the whole day is closed out
        assert_eq!(reset_cutoff(date, start + 3 * DAY_MS), start + DAY_MS);
        // running at 04:00 on the day itself: only what happened before now
        let four_am = start + 4 * 3_600_000;
        assert_eq!(reset_cutoff(date, four_am), four_am);
    }

    #[test]
    fn second_run_for_a_date_is_skipped() {
        assert!(skip_if_unclaimed(1, 7, "2026-03-01").is_none());
        let summary = skip_if_unclaimed(0, 7, "2026-03-01").unwrap();
        assert!(summary.skipped);
        assert_eq!(summary.venue_id, 7);
        assert_eq!(summary.reset_date, "2026-03-01");
        assert_eq!(summary.orders_completed + summary.orders_cancelled, 0);
        assert_eq!(summary.sessions_closed, 0);
    }
}
