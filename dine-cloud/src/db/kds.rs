//! Kitchen stations and tickets

use shared::error::{AppError, ErrorCode};
use shared::kds::{TicketStatus, check_ticket_transition, order_status_after_ticket_change, tickets_for_order};
use shared::models::{
    BackfillError, BackfillResult, KdsStation, KdsStationCreate, KdsTicket, Order,
    TicketUpdateResponse,
};
use shared::order::{OrderStatus, is_kitchen_eligible};
use shared::util::{now_millis, snowflake_id};
use sqlx::{PgConnection, PgPool};

use crate::error::ServiceResult;

const STATION_COLUMNS: &str = "id, venue_id, name, station_type, display_order, is_active, created_at";
const TICKET_COLUMNS: &str = "id, venue_id, order_id, item_index, station_id, item_name, quantity, notes, status, table_label, created_at, started_at, ready_at, bumped_at";

pub async fn list_stations(pool: &PgPool, venue_id: i64) -> Result<Vec<KdsStation>, sqlx::Error> {
    sqlx::query_as::<_, KdsStation>(&format!(
        "SELECT {STATION_COLUMNS} FROM kds_stations WHERE venue_id = $1 ORDER BY display_order, id"
    ))
    .bind(venue_id)
    .fetch_all(pool)
    .await
}

pub async fn create_station(
    pool: &PgPool,
    venue_id: i64,
    data: &KdsStationCreate,
) -> Result<KdsStation, sqlx::Error> {
    sqlx::query_as::<_, KdsStation>(&format!(
        r#"
        INSERT INTO kds_stations (id, venue_id, name, station_type, display_order, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        RETURNING {STATION_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(venue_id)
    .bind(data.name.trim())
    .bind(data.station_type)
    .bind(data.display_order.unwrap_or(0))
    .bind(now_millis())
    .fetch_one(pool)
    .await
}

/// Deactivate a station; its tickets keep their routing
pub async fn deactivate_station(
    pool: &PgPool,
    venue_id: i64,
    station_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE kds_stations SET is_active = FALSE WHERE id = $1 AND venue_id = $2")
        .bind(station_id)
        .bind(venue_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Tickets oldest first; open tickets only unless `include_bumped`
pub async fn list_tickets(
    pool: &PgPool,
    venue_id: i64,
    station_id: Option<i64>,
    include_bumped: bool,
) -> Result<Vec<KdsTicket>, sqlx::Error> {
    sqlx::query_as::<_, KdsTicket>(&format!(
        r#"
        SELECT {TICKET_COLUMNS} FROM kds_tickets
        WHERE venue_id = $1
          AND ($2::BIGINT IS NULL OR station_id = $2)
          AND ($3 OR status <> 'BUMPED')
        ORDER BY created_at, order_id, item_index
        LIMIT 500
        "#
    ))
    .bind(venue_id)
    .bind(station_id)
    .bind(include_bumped)
    .fetch_all(pool)
    .await
}

/// Create the tickets of `order` if the kitchen should see it.
///
/// Idempotent: `(order_id, item_index)` is unique, so existing tickets are
/// left alone. Returns the number of tickets inserted.
pub(crate) async fn ensure_tickets(conn: &mut PgConnection, order: &Order) -> Result<u64, sqlx::Error> {
    if !is_kitchen_eligible(order.status, order.payment_status, order.payment_method) {
        return Ok(0);
    }

    let stations = sqlx::query_as::<_, KdsStation>(&format!(
        "SELECT {STATION_COLUMNS} FROM kds_stations WHERE venue_id = $1"
    ))
    .bind(order.venue_id)
    .fetch_all(&mut *conn)
    .await?;

    let table_label: Option<String> = match order.table_id {
        Some(table_id) => sqlx::query_as::<_, (String,)>("SELECT label FROM venue_tables WHERE id = $1")
            .bind(table_id)
            .fetch_optional(&mut *conn)
            .await?
            .map(|r| r.0),
        None => None,
    };

    let now = now_millis();
    let mut created = 0;
    for draft in tickets_for_order(&order.items, &stations) {
        created += sqlx::query(
            r#"
            INSERT INTO kds_tickets (id, venue_id, order_id, item_index, station_id, item_name,
                                     quantity, notes, status, table_label, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'NEW', $9, $10)
            ON CONFLICT (order_id, item_index) DO NOTHING
            "#,
        )
        .bind(snowflake_id())
        .bind(order.venue_id)
        .bind(order.id)
        .bind(draft.item_index)
        .bind(draft.station_id)
        .bind(&draft.item_name)
        .bind(draft.quantity)
        .bind(draft.notes.as_deref())
        .bind(table_label.as_deref())
        .bind(now)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }

    if created > 0 {
        tracing::debug!(order_id = order.id, created, "Kitchen tickets created");
    }
    Ok(created)
}

/// Bump every open ticket of an order (order cancelled or closed out)
pub(crate) async fn bump_open_tickets(conn: &mut PgConnection, order_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE kds_tickets SET status = 'BUMPED', bumped_at = $2 WHERE order_id = $1 AND status <> 'BUMPED'",
    )
    .bind(order_id)
    .bind(now_millis())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Move a ticket and advance its order when the tickets say so
pub async fn update_ticket(
    pool: &PgPool,
    venue_id: i64,
    ticket_id: i64,
    to: TicketStatus,
) -> ServiceResult<TicketUpdateResponse> {
    let mut tx = pool.begin().await?;

    let ticket = sqlx::query_as::<_, KdsTicket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM kds_tickets WHERE id = $1 AND venue_id = $2"
    ))
    .bind(ticket_id)
    .bind(venue_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::with_message(ErrorCode::TicketNotFound, "Ticket not found")
            .with_detail("ticket_id", ticket_id)
    })?;

    // Order first, then ticket: the same lock order as order-side writers
    let order_status: Option<(OrderStatus,)> =
        sqlx::query_as("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(ticket.order_id)
            .fetch_optional(&mut *tx)
            .await?;

    let ticket = sqlx::query_as::<_, KdsTicket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM kds_tickets WHERE id = $1 FOR UPDATE"
    ))
    .bind(ticket_id)
    .fetch_one(&mut *tx)
    .await?;
    check_ticket_transition(ticket.status, to)?;

    let now = now_millis();
    let ticket = sqlx::query_as::<_, KdsTicket>(&format!(
        r#"
        UPDATE kds_tickets SET
            status = $2,
            started_at = CASE WHEN $2 = 'IN_PROGRESS' THEN COALESCE(started_at, $3) ELSE started_at END,
            ready_at = CASE WHEN $2 = 'READY' THEN $3 ELSE ready_at END,
            bumped_at = CASE WHEN $2 = 'BUMPED' THEN $3 ELSE bumped_at END
        WHERE id = $1
        RETURNING {TICKET_COLUMNS}
        "#
    ))
    .bind(ticket_id)
    .bind(to)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let mut new_order_status = None;
    if let Some((current,)) = order_status {
        let statuses: Vec<(TicketStatus,)> =
            sqlx::query_as("SELECT status FROM kds_tickets WHERE order_id = $1")
                .bind(ticket.order_id)
                .fetch_all(&mut *tx)
                .await?;
        let statuses: Vec<TicketStatus> = statuses.into_iter().map(|r| r.0).collect();

        if let Some(next) = order_status_after_ticket_change(current, &statuses) {
            sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(ticket.order_id)
                .bind(next)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            tracing::info!(order_id = ticket.order_id, from = %current, to = %next, "Order advanced by kitchen");
            new_order_status = Some(next);
        }
    }

    tx.commit().await?;
    Ok(TicketUpdateResponse {
        ticket,
        order_status: new_order_status,
    })
}

/// Create missing tickets for active, kitchen-eligible orders.
///
/// Each order runs in its own transaction; a failure is reported for that
/// order and the sweep continues.
pub async fn backfill(pool: &PgPool, venue_id: i64) -> Result<BackfillResult, sqlx::Error> {
    let candidates: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT o.id FROM orders o
        WHERE o.venue_id = $1
          AND o.status NOT IN ('COMPLETED', 'CANCELLED')
          AND NOT EXISTS (SELECT 1 FROM kds_tickets t WHERE t.order_id = o.id)
        ORDER BY o.created_at
        "#,
    )
    .bind(venue_id)
    .fetch_all(pool)
    .await?;

    let mut result = BackfillResult {
        orders_scanned: candidates.len(),
        ..Default::default()
    };

    for (order_id,) in candidates {
        match backfill_order(pool, order_id).await {
            Ok(0) => {}
            Ok(created) => {
                result.orders_backfilled += 1;
                result.tickets_created += created;
            }
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Ticket backfill failed");
                result.errors.push(BackfillError {
                    order_id,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        venue_id,
        scanned = result.orders_scanned,
        backfilled = result.orders_backfilled,
        errors = result.errors.len(),
        "KDS backfill finished"
    );
    Ok(result)
}

async fn backfill_order(pool: &PgPool, order_id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let order = super::orders::lock_by_id(&mut tx, order_id).await?;
    let created = match order {
        Some(order) => ensure_tickets(&mut tx, &order).await?,
        None => 0,
    };
    tx.commit().await?;
    Ok(created)
}
