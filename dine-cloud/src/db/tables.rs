//! Tables and table sessions
//!
//! Session changes always lock the `venue_tables` row first, so placing an
//! order, seating a party and closing the table serialize per table.

use shared::error::{AppError, ErrorCode};
use shared::models::{TableCreate, TableOverview, TableSession, TableUpdate, VenueTable};
use shared::order::{
    OrderStatus, PaymentStatus, SessionAction, TableSessionStatus, check_seat, check_table_close,
    closeout, session_after_order_placed, session_closes_after_settle,
};
use shared::payment::QrType;
use shared::util::{now_millis, snowflake_id};
use sqlx::{PgConnection, PgPool};

use super::orders;
use crate::error::{ServiceResult, map_unique};

const TABLE_COLUMNS: &str = "id, venue_id, label, capacity, qr_type, is_active, created_at";
const SESSION_COLUMNS: &str = "id, venue_id, table_id, status, party_size, opened_at, closed_at";
const LABEL_CONSTRAINT: &str = "uq_venue_tables_label";

fn label_exists(label: &str) -> AppError {
    AppError::with_message(ErrorCode::TableLabelExists, "A table with this label already exists")
        .with_detail("label", label)
}

pub(crate) fn table_not_found(table_id: i64) -> AppError {
    AppError::with_message(ErrorCode::TableNotFound, "Table not found")
        .with_detail("table_id", table_id)
}

/// Tables with their open session, ordered by label
pub async fn list(pool: &PgPool, venue_id: i64) -> Result<Vec<TableOverview>, sqlx::Error> {
    sqlx::query_as::<_, TableOverview>(
        r#"
        SELECT t.id, t.label, t.capacity, t.qr_type, t.is_active,
               s.id AS session_id, s.status AS session_status, s.party_size, s.opened_at
        FROM venue_tables t
        LEFT JOIN table_sessions s ON s.table_id = t.id AND s.closed_at IS NULL
        WHERE t.venue_id = $1
        ORDER BY lower(t.label)
        "#,
    )
    .bind(venue_id)
    .fetch_all(pool)
    .await
}

pub async fn find(
    pool: &PgPool,
    venue_id: i64,
    table_id: i64,
) -> Result<Option<VenueTable>, sqlx::Error> {
    sqlx::query_as::<_, VenueTable>(&format!(
        "SELECT {TABLE_COLUMNS} FROM venue_tables WHERE id = $1 AND venue_id = $2"
    ))
    .bind(table_id)
    .bind(venue_id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, venue_id: i64, data: &TableCreate) -> ServiceResult<VenueTable> {
    insert(pool, venue_id, data.label.trim(), data.capacity, data.qr_type).await
}

/// Insert one table; shared by the REST handler and the assistant
pub async fn insert(
    pool: &PgPool,
    venue_id: i64,
    label: &str,
    capacity: Option<i32>,
    qr_type: Option<QrType>,
) -> ServiceResult<VenueTable> {
    sqlx::query_as::<_, VenueTable>(&format!(
        r#"
        INSERT INTO venue_tables (id, venue_id, label, capacity, qr_type, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        RETURNING {TABLE_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(venue_id)
    .bind(label)
    .bind(capacity.unwrap_or(4))
    .bind(qr_type.unwrap_or(QrType::TableFullService))
    .bind(now_millis())
    .fetch_one(pool)
    .await
    .map_err(|e| map_unique(e, LABEL_CONSTRAINT, label_exists(label)))
}

pub async fn update(
    pool: &PgPool,
    venue_id: i64,
    table_id: i64,
    data: &TableUpdate,
) -> ServiceResult<VenueTable> {
    let label = data.label.as_deref().map(str::trim);
    let table = sqlx::query_as::<_, VenueTable>(&format!(
        r#"
        UPDATE venue_tables SET
            label = COALESCE($3, label),
            capacity = COALESCE($4, capacity),
            qr_type = COALESCE($5, qr_type),
            is_active = COALESCE($6, is_active)
        WHERE id = $1 AND venue_id = $2
        RETURNING {TABLE_COLUMNS}
        "#
    ))
    .bind(table_id)
    .bind(venue_id)
    .bind(label)
    .bind(data.capacity)
    .bind(data.qr_type)
    .bind(data.is_active)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_unique(e, LABEL_CONSTRAINT, label_exists(label.unwrap_or_default())))?;

    table.ok_or_else(|| table_not_found(table_id).into())
}

/// Delete a table; refused while a session is open
pub async fn delete(pool: &PgPool, venue_id: i64, table_id: i64) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    lock_table(&mut tx, venue_id, table_id).await?;
    if open_session(&mut tx, table_id).await?.is_some() {
        return Err(AppError::with_message(
            ErrorCode::TableOccupied,
            "Close the table before deleting it",
        )
        .into());
    }
    sqlx::query("DELETE FROM venue_tables WHERE id = $1 AND venue_id = $2")
        .bind(table_id)
        .bind(venue_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Lock the table row; missing or inactive tables are rejected
pub(crate) async fn lock_table(
    conn: &mut PgConnection,
    venue_id: i64,
    table_id: i64,
) -> ServiceResult<VenueTable> {
    let table = sqlx::query_as::<_, VenueTable>(&format!(
        "SELECT {TABLE_COLUMNS} FROM venue_tables WHERE id = $1 AND venue_id = $2 FOR UPDATE"
    ))
    .bind(table_id)
    .bind(venue_id)
    .fetch_optional(&mut *conn)
    .await?;

    match table {
        Some(t) if t.is_active => Ok(t),
        _ => Err(table_not_found(table_id).into()),
    }
}

/// Open session of a table, locked
pub(crate) async fn open_session(
    conn: &mut PgConnection,
    table_id: i64,
) -> Result<Option<TableSession>, sqlx::Error> {
    sqlx::query_as::<_, TableSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM table_sessions WHERE table_id = $1 AND closed_at IS NULL FOR UPDATE"
    ))
    .bind(table_id)
    .fetch_optional(&mut *conn)
    .await
}

async fn insert_session(
    conn: &mut PgConnection,
    table: &VenueTable,
    status: TableSessionStatus,
    party_size: Option<i32>,
) -> Result<TableSession, sqlx::Error> {
    sqlx::query_as::<_, TableSession>(&format!(
        r#"
        INSERT INTO table_sessions (id, venue_id, table_id, status, party_size, opened_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {SESSION_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(table.venue_id)
    .bind(table.id)
    .bind(status)
    .bind(party_size)
    .bind(now_millis())
    .fetch_one(&mut *conn)
    .await
}

/// Seat a party at a free table (staff)
pub async fn seat(
    pool: &PgPool,
    venue_id: i64,
    table_id: i64,
    party_size: Option<i32>,
) -> ServiceResult<TableSession> {
    let mut tx = pool.begin().await?;
    let table = lock_table(&mut tx, venue_id, table_id).await?;
    let current = open_session(&mut tx, table_id).await?;
    check_seat(current.as_ref().map(|s| s.status))?;

    let session = insert_session(&mut tx, &table, TableSessionStatus::Ordering, party_size).await?;
    tx.commit().await?;
    tracing::info!(venue_id, table_id, session_id = session.id, "Party seated");
    Ok(session)
}

/// Customer scanned the table QR: reuse the open session or start one
pub async fn start_customer_session(
    pool: &PgPool,
    venue_id: i64,
    table_id: i64,
) -> ServiceResult<TableSession> {
    let mut tx = pool.begin().await?;
    let table = lock_table(&mut tx, venue_id, table_id).await?;
    if !table.qr_type.requires_table() {
        return Err(AppError::invalid_request("Counter QR codes have no table session").into());
    }

    let session = match open_session(&mut tx, table_id).await? {
        Some(session) => session,
        None => insert_session(&mut tx, &table, TableSessionStatus::Ordering, None).await?,
    };
    tx.commit().await?;
    Ok(session)
}

/// Apply the session effect of a new order on `table`; returns the session id
pub(crate) async fn session_for_new_order(
    conn: &mut PgConnection,
    table: &VenueTable,
) -> Result<i64, sqlx::Error> {
    let current = open_session(conn, table.id).await?;
    match (session_after_order_placed(current.as_ref().map(|s| s.status)), current) {
        (SessionAction::MarkOccupied, Some(session)) => {
            sqlx::query("UPDATE table_sessions SET status = $2 WHERE id = $1")
                .bind(session.id)
                .bind(TableSessionStatus::Occupied)
                .execute(&mut *conn)
                .await?;
            Ok(session.id)
        }
        (SessionAction::Unchanged, Some(session)) => Ok(session.id),
        _ => {
            let session =
                insert_session(conn, table, TableSessionStatus::Occupied, None).await?;
            Ok(session.id)
        }
    }
}

async fn close_session_row(conn: &mut PgConnection, session_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE table_sessions SET status = $2, closed_at = $3 WHERE id = $1")
        .bind(session_id)
        .bind(TableSessionStatus::Free)
        .bind(now_millis())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Close the session once every one of its orders is terminal.
///
/// Called inside the transaction that just settled an order of the session.
pub(crate) async fn close_session_if_settled(
    conn: &mut PgConnection,
    session_id: i64,
) -> Result<bool, sqlx::Error> {
    let open: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM table_sessions WHERE id = $1 AND closed_at IS NULL FOR UPDATE",
    )
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;
    if open.is_none() {
        return Ok(false);
    }

    let statuses: Vec<(OrderStatus,)> =
        sqlx::query_as("SELECT status FROM orders WHERE session_id = $1")
            .bind(session_id)
            .fetch_all(&mut *conn)
            .await?;
    let statuses: Vec<OrderStatus> = statuses.into_iter().map(|r| r.0).collect();
    if !session_closes_after_settle(&statuses) {
        return Ok(false);
    }

    close_session_row(conn, session_id).await?;
    tracing::info!(session_id, "Table session closed after last order settled");
    Ok(true)
}

/// Result of closing a table by hand
#[derive(Debug, Clone, serde::Serialize)]
pub struct CloseOutcome {
    pub session_id: i64,
    pub orders_completed: u64,
    pub orders_cancelled: u64,
}

/// Close a table (staff). With `force`, active orders are settled: paid
/// ones complete, unpaid ones are cancelled.
pub async fn close(
    pool: &PgPool,
    venue_id: i64,
    table_id: i64,
    force: bool,
) -> ServiceResult<CloseOutcome> {
    let mut tx = pool.begin().await?;
    lock_table(&mut tx, venue_id, table_id).await?;
    let session = open_session(&mut tx, table_id).await?;
    let current = session
        .as_ref()
        .map(|s| s.status)
        .unwrap_or(TableSessionStatus::Free);

    let open_orders: Vec<(i64, OrderStatus, PaymentStatus)> = match &session {
        Some(s) => {
            sqlx::query_as(
                "SELECT id, status, payment_status FROM orders WHERE session_id = $1 AND status NOT IN ('COMPLETED', 'CANCELLED') FOR UPDATE",
            )
            .bind(s.id)
            .fetch_all(&mut *tx)
            .await?
        }
        None => Vec::new(),
    };
    let statuses: Vec<(OrderStatus, PaymentStatus)> =
        open_orders.iter().map(|(_, status, payment)| (*status, *payment)).collect();
    check_table_close(current, &statuses, force)?;

    let Some(session) = session else {
        return Err(AppError::with_message(ErrorCode::SessionNotFound, "Table has no open session").into());
    };

    let now = now_millis();
    let (completed, cancelled) = orders::apply_closeout(&mut tx, &closeout(&open_orders), now).await?;

    sqlx::query(
        r#"
        UPDATE kds_tickets SET status = 'BUMPED', bumped_at = $2
        WHERE status <> 'BUMPED' AND order_id IN (SELECT id FROM orders WHERE session_id = $1)
        "#,
    )
    .bind(session.id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    close_session_row(&mut tx, session.id).await?;
    tx.commit().await?;

    tracing::info!(
        venue_id,
        table_id,
        session_id = session.id,
        force,
        completed,
        cancelled,
        "Table closed"
    );
    Ok(CloseOutcome {
        session_id: session.id,
        orders_completed: completed,
        orders_cancelled: cancelled,
    })
}
