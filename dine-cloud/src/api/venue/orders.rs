//! Order endpoints: list, POS placement, status, payment and refunds

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    MarkPaidRequest, Order, OrderCreate, OrderListQuery, OrderStatusUpdate, PayMultipleRequest,
    PayMultipleResponse, RefundRequest,
};
use shared::order::check_refund;
use shared::staff::permissions;
use validator::Validate;

use crate::auth::{UserIdentity, require_venue, venue_access};
use crate::db;
use crate::db::orders::order_not_found;
use crate::error::internal;
use crate::state::AppState;
use crate::stripe;

use super::ApiResult;

/// GET /api/venues/{venue_id}/orders?status=&active=&table_id=
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<Order>> {
    venue_access(&state, venue_id, &identity).await?;
    let orders = db::orders::list(&state.pool, venue_id, &query)
        .await
        .map_err(internal)?;
    Ok(Json(orders))
}

/// POST /api/venues/{venue_id}/orders (POS)
pub async fn create_order(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<OrderCreate>,
) -> ApiResult<Order> {
    require_venue(&state, venue_id, &identity, permissions::ORDERS_MANAGE).await?;
    data.validate()?;
    let order = db::orders::place(&state.pool, venue_id, &data).await?;
    Ok(Json(order))
}

/// GET /api/venues/{venue_id}/orders/{order_id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, order_id)): Path<(i64, i64)>,
) -> ApiResult<Order> {
    venue_access(&state, venue_id, &identity).await?;
    let order = db::orders::find(&state.pool, venue_id, order_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| order_not_found(order_id))?;
    Ok(Json(order))
}

/// PATCH /api/venues/{venue_id}/orders/{order_id}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, order_id)): Path<(i64, i64)>,
    Json(data): Json<OrderStatusUpdate>,
) -> ApiResult<Order> {
    require_venue(&state, venue_id, &identity, permissions::ORDERS_MANAGE).await?;
    let order = db::orders::change_status(&state.pool, venue_id, order_id, data.status).await?;
    Ok(Json(order))
}

/// POST /api/venues/{venue_id}/orders/{order_id}/mark-paid
pub async fn mark_paid(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, order_id)): Path<(i64, i64)>,
    Json(data): Json<MarkPaidRequest>,
) -> ApiResult<Order> {
    require_venue(&state, venue_id, &identity, permissions::PAYMENTS_COLLECT).await?;
    let order = db::orders::mark_paid(&state.pool, venue_id, order_id, data.payment_method).await?;
    Ok(Json(order))
}

/// POST /api/venues/{venue_id}/orders/pay-multiple
///
/// All-or-nothing: one already-paid order rejects the whole batch.
pub async fn pay_multiple(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<PayMultipleRequest>,
) -> ApiResult<PayMultipleResponse> {
    require_venue(&state, venue_id, &identity, permissions::PAYMENTS_COLLECT).await?;
    let result =
        db::orders::pay_multiple(&state.pool, venue_id, &data.order_ids, data.payment_method)
            .await?;
    Ok(Json(result))
}

/// POST /api/venues/{venue_id}/orders/{order_id}/refund
///
/// Card payments are refunded through Stripe first; cash and till payments
/// are only marked.
pub async fn refund_order(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, order_id)): Path<(i64, i64)>,
    Json(data): Json<RefundRequest>,
) -> ApiResult<Order> {
    let access = require_venue(&state, venue_id, &identity, permissions::PAYMENTS_REFUND).await?;
    let order = db::orders::find(&state.pool, venue_id, order_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| order_not_found(order_id))?;
    check_refund(order.payment_status)?;

    if let Some(intent) = order.payment_intent_id.as_deref() {
        let refund_id = stripe::create_refund(&state.http, &state.stripe_secret_key, intent, order.id)
            .await
            .map_err(|e| {
                tracing::error!(order_id, error = %e, "Stripe refund failed");
                AppError::with_message(ErrorCode::PaymentFailed, "Refund could not be issued")
            })?;
        tracing::info!(order_id, refund_id = %refund_id, "Stripe refund created");
    }

    let order = db::orders::mark_refunded(
        &state.pool,
        venue_id,
        order_id,
        order.payment_intent_id.as_deref(),
    )
    .await?;
    tracing::info!(
        venue_id,
        order_id,
        user_id = %access.user_id,
        reason = data.reason.as_deref().unwrap_or(""),
        "Order refunded"
    );
    Ok(Json(order))
}
