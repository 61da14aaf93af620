//! Bill splits: one bill over several orders, paid share by share.
//!
//! Orders are only marked PAID when the last share is paid.

use shared::billing::{SplitError, SplitMode, SplitStatus, settle_share, split_custom, split_equal};
use shared::error::{AppError, ErrorCode};
use shared::models::{BillShare, BillSplit, BillSplitCreate, BillSplitDetail};
use shared::payment::PaymentMethod;
use shared::util::{now_millis, snowflake_id};
use sqlx::{PgConnection, PgPool};

use super::orders;
use crate::error::ServiceResult;

const SPLIT_COLUMNS: &str =
    "id, venue_id, order_ids, mode, total_amount, status, created_by, created_at, settled_at";
const SHARE_COLUMNS: &str = "id, split_id, share_index, amount, paid, payment_method, paid_at";

fn split_not_found(split_id: i64) -> AppError {
    AppError::with_message(ErrorCode::SplitNotFound, "Bill split not found")
        .with_detail("split_id", split_id)
}

async fn load_shares(conn: &mut PgConnection, split_id: i64) -> Result<Vec<BillShare>, sqlx::Error> {
    sqlx::query_as::<_, BillShare>(&format!(
        "SELECT {SHARE_COLUMNS} FROM bill_split_shares WHERE split_id = $1 ORDER BY share_index"
    ))
    .bind(split_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn create(
    pool: &PgPool,
    venue_id: i64,
    created_by: &str,
    data: &BillSplitCreate,
) -> ServiceResult<BillSplitDetail> {
    let mut tx = pool.begin().await?;
    let total = orders::lock_payable(&mut tx, venue_id, &data.order_ids).await?;

    let (mode, amounts) = match (&data.amounts, data.parts) {
        (Some(amounts), None) => (SplitMode::Custom, split_custom(total, amounts)?),
        (None, Some(parts)) => (SplitMode::Equal, split_equal(total, parts)?),
        _ => {
            return Err(AppError::validation("Provide either parts or amounts").into());
        }
    };

    let split = sqlx::query_as::<_, BillSplit>(&format!(
        r#"
        INSERT INTO bill_splits (id, venue_id, order_ids, mode, total_amount, status, created_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {SPLIT_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(venue_id)
    .bind(&data.order_ids)
    .bind(mode)
    .bind(total)
    .bind(SplitStatus::Open)
    .bind(created_by)
    .bind(now_millis())
    .fetch_one(&mut *tx)
    .await?;

    let mut shares = Vec::with_capacity(amounts.len());
    for (index, amount) in amounts.into_iter().enumerate() {
        let share = sqlx::query_as::<_, BillShare>(&format!(
            r#"
            INSERT INTO bill_split_shares (id, split_id, share_index, amount, paid)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING {SHARE_COLUMNS}
            "#
        ))
        .bind(snowflake_id())
        .bind(split.id)
        .bind(index as i32)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;
        shares.push(share);
    }

    tx.commit().await?;
    tracing::info!(venue_id, split_id = split.id, mode = %mode, shares = shares.len(), total = %total, "Bill split created");
    Ok(BillSplitDetail { split, shares })
}

pub async fn find(
    pool: &PgPool,
    venue_id: i64,
    split_id: i64,
) -> Result<Option<BillSplitDetail>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let split = sqlx::query_as::<_, BillSplit>(&format!(
        "SELECT {SPLIT_COLUMNS} FROM bill_splits WHERE id = $1 AND venue_id = $2"
    ))
    .bind(split_id)
    .bind(venue_id)
    .fetch_optional(&mut *conn)
    .await?;

    match split {
        Some(split) => {
            let shares = load_shares(&mut conn, split_id).await?;
            Ok(Some(BillSplitDetail { split, shares }))
        }
        None => Ok(None),
    }
}

/// Pay one share; the last share settles the split and its orders
pub async fn pay_share(
    pool: &PgPool,
    venue_id: i64,
    split_id: i64,
    share_id: i64,
    method: Option<PaymentMethod>,
) -> ServiceResult<BillSplitDetail> {
    let mut tx = pool.begin().await?;

    let split = sqlx::query_as::<_, BillSplit>(&format!(
        "SELECT {SPLIT_COLUMNS} FROM bill_splits WHERE id = $1 AND venue_id = $2 FOR UPDATE"
    ))
    .bind(split_id)
    .bind(venue_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| split_not_found(split_id))?;

    if split.status == SplitStatus::Settled {
        return Err(SplitError::ShareAlreadyPaid(share_id).into());
    }

    let shares = load_shares(&mut tx, split_id).await?;
    let state: Vec<(i64, bool)> = shares.iter().map(|s| (s.id, s.paid)).collect();
    let last = settle_share(&state, share_id)?;

    let now = now_millis();
    sqlx::query(
        "UPDATE bill_split_shares SET paid = TRUE, payment_method = $2, paid_at = $3 WHERE id = $1",
    )
    .bind(share_id)
    .bind(method)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let split = if last {
        let tickets = orders::settle_orders(&mut tx, venue_id, &split.order_ids, method).await?;
        tracing::info!(venue_id, split_id, tickets, "Bill split settled");
        sqlx::query_as::<_, BillSplit>(&format!(
            "UPDATE bill_splits SET status = $2, settled_at = $3 WHERE id = $1 RETURNING {SPLIT_COLUMNS}"
        ))
        .bind(split_id)
        .bind(SplitStatus::Settled)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?
    } else {
        split
    };

    let shares = load_shares(&mut tx, split_id).await?;
    tx.commit().await?;
    Ok(BillSplitDetail { split, shares })
}
