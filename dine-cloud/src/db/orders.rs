//! Orders: placement, lifecycle and payment
//!
//! Every write locks the order row (`FOR UPDATE`) and re-checks the rules
//! from `shared::order` inside the transaction.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderCreate, OrderItem, OrderListQuery, PayMultipleResponse};
use shared::order::{
    CheckoutAction, Closeout, OrderStatus, PaymentStatus, check_mark_paid, check_refund,
    check_status_transition, checkout_action, refund_already_recorded,
};
use shared::payment::{
    PayableOrder, PaymentMethod, validate_order_target, validate_pay_multiple,
    validate_payment_method_for_qr_type,
};
use shared::types::PageQuery;
use shared::util::{now_millis, snowflake_id};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use super::{kds, menu, tables};
use crate::error::ServiceResult;

const ORDER_COLUMNS: &str = "id, venue_id, table_id, session_id, qr_type, payment_method, status, payment_status, items, total_amount, customer_name, notes, stripe_session_id, payment_intent_id, paid_at, created_at, updated_at";

pub(crate) fn order_not_found(order_id: i64) -> AppError {
    AppError::with_message(ErrorCode::OrderNotFound, "Order not found")
        .with_detail("order_id", order_id)
}

pub async fn list(
    pool: &PgPool,
    venue_id: i64,
    query: &OrderListQuery,
) -> Result<Vec<Order>, sqlx::Error> {
    let (limit, offset) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .limit_offset();

    sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM orders
        WHERE venue_id = $1
          AND ($2::TEXT IS NULL OR status = $2)
          AND ($3::BOOLEAN IS NULL OR (status NOT IN ('COMPLETED', 'CANCELLED')) = $3)
          AND ($4::BIGINT IS NULL OR table_id = $4)
        ORDER BY created_at DESC
        LIMIT $5 OFFSET $6
        "#
    ))
    .bind(venue_id)
    .bind(query.status)
    .bind(query.active)
    .bind(query.table_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, venue_id: i64, order_id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND venue_id = $2"
    ))
    .bind(order_id)
    .bind(venue_id)
    .fetch_optional(pool)
    .await
}

/// Order by id alone (customer order links carry no venue)
pub async fn find_by_id(pool: &PgPool, order_id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await
}

/// Ids of SERVING orders that are already paid (ready to complete)
pub async fn served_and_paid(pool: &PgPool, venue_id: i64) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT id FROM orders WHERE venue_id = $1 AND status = 'SERVING' AND payment_status = 'PAID' ORDER BY id",
    )
    .bind(venue_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub(crate) async fn lock_by_id(
    conn: &mut PgConnection,
    order_id: i64,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await
}

async fn lock(conn: &mut PgConnection, venue_id: i64, order_id: i64) -> ServiceResult<Order> {
    match lock_by_id(conn, order_id).await? {
        Some(order) if order.venue_id == venue_id => Ok(order),
        _ => Err(order_not_found(order_id).into()),
    }
}

/// Resolve requested lines against the menu, freezing name and price
async fn resolve_items(
    conn: &mut PgConnection,
    venue_id: i64,
    data: &OrderCreate,
) -> ServiceResult<Vec<OrderItem>> {
    let ids: Vec<i64> = data.items.iter().map(|i| i.menu_item_id).collect();
    let menu_items = menu::find_many(conn, venue_id, &ids).await?;

    let mut missing = Vec::new();
    let mut unavailable = Vec::new();
    let mut items = Vec::with_capacity(data.items.len());
    for input in &data.items {
        match menu_items.iter().find(|m| m.id == input.menu_item_id) {
            None => missing.push(input.menu_item_id),
            Some(m) if !m.is_available => unavailable.push(m.id),
            Some(m) => items.push(OrderItem {
                menu_item_id: m.id,
                name: m.name.clone(),
                quantity: input.quantity,
                unit_price: m.price,
                category: m.category.clone(),
                notes: input.notes.clone(),
            }),
        }
    }

    if !missing.is_empty() {
        return Err(
            AppError::with_message(ErrorCode::MenuItemNotFound, "Menu item not found")
                .with_detail("menu_item_ids", missing)
                .into(),
        );
    }
    if !unavailable.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::MenuItemUnavailable,
            "Some items are no longer available",
        )
        .with_detail("menu_item_ids", unavailable)
        .into());
    }
    Ok(items)
}

/// Place an order (QR customer or POS).
///
/// One transaction: table lock, session transition, price snapshot,
/// order insert, and kitchen tickets when the order is kitchen-eligible.
pub async fn place(pool: &PgPool, venue_id: i64, data: &OrderCreate) -> ServiceResult<Order> {
    validate_payment_method_for_qr_type(data.payment_method, data.qr_type)?;
    validate_order_target(data.qr_type, data.table_id)?;

    let mut tx = pool.begin().await?;

    let table = match data.table_id {
        Some(table_id) => {
            let table = tables::lock_table(&mut tx, venue_id, table_id).await?;
            if table.qr_type != data.qr_type {
                return Err(AppError::invalid_request("QR type does not match the table")
                    .with_detail("expected", table.qr_type.as_db())
                    .into());
            }
            Some(table)
        }
        None => None,
    };

    let items = resolve_items(&mut tx, venue_id, data).await?;
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty).into());
    }
    let total: Decimal = items.iter().map(OrderItem::line_total).sum();

    let session_id = match &table {
        Some(table) => Some(tables::session_for_new_order(&mut tx, table).await?),
        None => None,
    };

    let now = now_millis();
    let order = sqlx::query_as::<_, Order>(&format!(
        r#"
        INSERT INTO orders (id, venue_id, table_id, session_id, qr_type, payment_method, status,
                            payment_status, items, total_amount, customer_name, notes,
                            created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'PLACED', 'UNPAID', $7, $8, $9, $10, $11, $11)
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(snowflake_id())
    .bind(venue_id)
    .bind(data.table_id)
    .bind(session_id)
    .bind(data.qr_type)
    .bind(data.payment_method)
    .bind(Json(&items))
    .bind(total)
    .bind(data.customer_name.as_deref())
    .bind(data.notes.as_deref())
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let tickets = kds::ensure_tickets(&mut tx, &order).await?;
    tx.commit().await?;

    tracing::info!(
        venue_id,
        order_id = order.id,
        table_id = ?order.table_id,
        qr_type = %order.qr_type,
        payment_method = %order.payment_method,
        total = %order.total_amount,
        tickets,
        "Order placed"
    );
    Ok(order)
}

/// Staff status change; terminal states may free the table
pub async fn change_status(
    pool: &PgPool,
    venue_id: i64,
    order_id: i64,
    to: OrderStatus,
) -> ServiceResult<Order> {
    let mut tx = pool.begin().await?;
    let order = lock(&mut tx, venue_id, order_id).await?;
    check_status_transition(order.status, to, order.payment_status)?;
    let from = order.status;

    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(to)
    .bind(now_millis())
    .fetch_one(&mut *tx)
    .await?;

    if to.is_terminal() {
        kds::bump_open_tickets(&mut tx, order_id).await?;
        if let Some(session_id) = order.session_id {
            tables::close_session_if_settled(&mut tx, session_id).await?;
        }
    }

    tx.commit().await?;
    tracing::info!(venue_id, order_id, from = %from, to = %to, "Order status changed");
    Ok(order)
}

async fn set_paid(
    conn: &mut PgConnection,
    order_id: i64,
    method: Option<PaymentMethod>,
) -> Result<Order, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE orders SET
            payment_status = 'PAID',
            payment_method = COALESCE($2, payment_method),
            paid_at = $3,
            updated_at = $3
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(method)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// Mark one order paid (till, table terminal)
pub async fn mark_paid(
    pool: &PgPool,
    venue_id: i64,
    order_id: i64,
    method: Option<PaymentMethod>,
) -> ServiceResult<Order> {
    let mut tx = pool.begin().await?;
    let order = lock(&mut tx, venue_id, order_id).await?;
    check_mark_paid(order.status, order.payment_status)?;

    let order = set_paid(&mut tx, order_id, method).await?;
    let tickets = kds::ensure_tickets(&mut tx, &order).await?;
    tx.commit().await?;

    tracing::info!(venue_id, order_id, method = %order.payment_method, tickets, "Order marked paid");
    Ok(order)
}

/// Outcome of a Stripe checkout completion
#[derive(Debug)]
pub enum CheckoutOutcome {
    Paid(Order),
    AlreadyPaid,
    /// Cancelled before the payment landed; the caller refunds it
    Cancelled(Order),
    NotFound,
}

/// Mark an order paid from a completed Checkout Session (webhook)
pub async fn mark_paid_by_checkout(
    pool: &PgPool,
    order_id: i64,
    stripe_session_id: &str,
    payment_intent: Option<&str>,
) -> ServiceResult<CheckoutOutcome> {
    let mut tx = pool.begin().await?;
    let Some(order) = lock_by_id(&mut tx, order_id).await? else {
        return Ok(CheckoutOutcome::NotFound);
    };
    match checkout_action(order.status, order.payment_status)? {
        CheckoutAction::MarkPaid => {}
        CheckoutAction::AlreadyPaid => return Ok(CheckoutOutcome::AlreadyPaid),
        CheckoutAction::RefundCancelled => return Ok(CheckoutOutcome::Cancelled(order)),
    }

    let now = now_millis();
    let order = sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE orders SET
            payment_status = 'PAID',
            stripe_session_id = $2,
            payment_intent_id = COALESCE($3, payment_intent_id),
            paid_at = $4,
            updated_at = $4
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(stripe_session_id)
    .bind(payment_intent)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let tickets = kds::ensure_tickets(&mut tx, &order).await?;
    tx.commit().await?;

    tracing::info!(order_id, venue_id = order.venue_id, tickets, "Order paid via Stripe checkout");
    Ok(CheckoutOutcome::Paid(order))
}

/// Lock `order_ids` (in id order) and validate them as one payment
pub(crate) async fn lock_payable(
    conn: &mut PgConnection,
    venue_id: i64,
    order_ids: &[i64],
) -> ServiceResult<Decimal> {
    let rows: Vec<(i64, i64, OrderStatus, PaymentStatus, Decimal)> = sqlx::query_as(
        r#"
        SELECT id, venue_id, status, payment_status, total_amount
        FROM orders WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await?;

    let payable: Vec<PayableOrder> = rows
        .into_iter()
        .map(|(id, venue_id, order_status, payment_status, total_amount)| PayableOrder {
            id,
            venue_id,
            order_status,
            payment_status,
            total_amount,
        })
        .collect();

    Ok(validate_pay_multiple(venue_id, order_ids, &payable)?)
}

/// Mark every still-unpaid order of `order_ids` paid and create tickets
/// for those that just became kitchen-eligible
pub(crate) async fn settle_orders(
    conn: &mut PgConnection,
    venue_id: i64,
    order_ids: &[i64],
    method: Option<PaymentMethod>,
) -> Result<u64, sqlx::Error> {
    let now = now_millis();
    let paid = sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE orders SET
            payment_status = 'PAID',
            payment_method = COALESCE($3, payment_method),
            paid_at = $4,
            updated_at = $4
        WHERE venue_id = $1 AND id = ANY($2)
          AND payment_status = 'UNPAID' AND status <> 'CANCELLED'
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(venue_id)
    .bind(order_ids)
    .bind(method)
    .bind(now)
    .fetch_all(&mut *conn)
    .await?;

    let mut tickets = 0;
    for order in &paid {
        tickets += kds::ensure_tickets(conn, order).await?;
    }
    Ok(tickets)
}

async fn set_status_many(
    conn: &mut PgConnection,
    order_ids: &[i64],
    status: OrderStatus,
    now: i64,
) -> Result<u64, sqlx::Error> {
    if order_ids.is_empty() {
        return Ok(0);
    }
    Ok(sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = ANY($1)")
        .bind(order_ids)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .rows_affected())
}

/// Write a closeout; returns (completed, cancelled)
pub(crate) async fn apply_closeout(
    conn: &mut PgConnection,
    closeout: &Closeout,
    now: i64,
) -> Result<(u64, u64), sqlx::Error> {
    let completed = set_status_many(conn, &closeout.complete, OrderStatus::Completed, now).await?;
    let cancelled = set_status_many(conn, &closeout.cancel, OrderStatus::Cancelled, now).await?;
    Ok((completed, cancelled))
}

/// Settle several orders with one payment (all or nothing)
pub async fn pay_multiple(
    pool: &PgPool,
    venue_id: i64,
    order_ids: &[i64],
    method: Option<PaymentMethod>,
) -> ServiceResult<PayMultipleResponse> {
    let mut tx = pool.begin().await?;
    let total = lock_payable(&mut tx, venue_id, order_ids).await?;
    let tickets_created = settle_orders(&mut tx, venue_id, order_ids, method).await?;
    tx.commit().await?;

    tracing::info!(venue_id, orders = order_ids.len(), total = %total, "Orders paid together");
    Ok(PayMultipleResponse {
        order_ids: order_ids.to_vec(),
        total_amount: total,
        tickets_created,
    })
}

/// Record a refund; the Stripe refund (if any) has already been issued
/// against `issued_intent`
pub async fn mark_refunded(
    pool: &PgPool,
    venue_id: i64,
    order_id: i64,
    issued_intent: Option<&str>,
) -> ServiceResult<Order> {
    let mut tx = pool.begin().await?;
    let order = lock(&mut tx, venue_id, order_id).await?;
    if refund_already_recorded(
        order.payment_status,
        order.payment_intent_id.as_deref(),
        issued_intent,
    ) {
        tracing::info!(venue_id, order_id, "Refund already recorded by webhook");
        return Ok(order);
    }
    check_refund(order.payment_status)?;

    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET payment_status = 'REFUNDED', updated_at = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(now_millis())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(venue_id, order_id, "Order refunded");
    Ok(order)
}

/// Refund reported by Stripe (`charge.refunded`); paid orders only
pub async fn mark_refunded_by_intent(
    pool: &PgPool,
    payment_intent: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE orders SET payment_status = 'REFUNDED', updated_at = $2
        WHERE payment_intent_id = $1 AND payment_status = 'PAID'
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(payment_intent)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

/// Record the refund of a checkout that completed after its order was
/// cancelled
pub async fn record_cancelled_checkout_refund(
    pool: &PgPool,
    order_id: i64,
    stripe_session_id: &str,
    payment_intent: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE orders SET
            payment_status = 'REFUNDED',
            stripe_session_id = $2,
            payment_intent_id = $3,
            updated_at = $4
        WHERE id = $1 AND status = 'CANCELLED' AND payment_status = 'UNPAID'
        "#,
    )
    .bind(order_id)
    .bind(stripe_session_id)
    .bind(payment_intent)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_checkout_session(
    pool: &PgPool,
    order_id: i64,
    stripe_session_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET stripe_session_id = $2, updated_at = $3 WHERE id = $1")
        .bind(order_id)
        .bind(stripe_session_id)
        .bind(now_millis())
        .execute(pool)
        .await?;
    Ok(())
}
