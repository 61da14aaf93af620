//! Public customer endpoints (QR ordering, no authentication)
//!
//! Order placement, feedback and checkout creation sit behind the per-IP
//! rate limiter; see `create_router`.

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CheckoutResponse, Feedback, FeedbackCreate, Order, OrderCreate, PublicMenu, PublicOrder,
    TableSession, Venue,
};
use shared::order::{OrderStatus, PaymentStatus};
use shared::payment::PaymentMethod;
use validator::Validate;

use crate::db;
use crate::db::orders::order_not_found;
use crate::error::internal;
use crate::state::AppState;
use crate::stripe;

use super::venue::ApiResult;

async fn active_venue(state: &AppState, venue_id: i64) -> Result<Venue, AppError> {
    db::venues::find_active(&state.pool, venue_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::VenueNotFound, "Venue not found")
                .with_detail("venue_id", venue_id)
        })
}

/// Only unpaid, live PAY_NOW orders can open a Stripe Checkout
fn check_checkout(order: &Order) -> Result<(), AppError> {
    let reason = if order.payment_method != PaymentMethod::PayNow {
        Some("Order is not paid online")
    } else if order.payment_status != PaymentStatus::Unpaid {
        Some("Order is already paid")
    } else if order.status == OrderStatus::Cancelled {
        Some("Order was cancelled")
    } else {
        None
    };
    match reason {
        Some(msg) => Err(AppError::with_message(ErrorCode::CheckoutUnavailable, msg)
            .with_detail("order_id", order.id)),
        None => Ok(()),
    }
}

/// GET /api/public/venues/{venue_id}/menu
pub async fn get_menu(
    State(state): State<AppState>,
    Path(venue_id): Path<i64>,
) -> ApiResult<PublicMenu> {
    let venue = active_venue(&state, venue_id).await?;
    let items = db::menu::list(&state.pool, venue_id, true)
        .await
        .map_err(internal)?;
    Ok(Json(PublicMenu {
        venue_id,
        name: venue.name,
        currency: venue.currency,
        items,
    }))
}

/// POST /api/public/venues/{venue_id}/tables/{table_id}/session
pub async fn start_session(
    State(state): State<AppState>,
    Path((venue_id, table_id)): Path<(i64, i64)>,
) -> ApiResult<TableSession> {
    active_venue(&state, venue_id).await?;
    let session = db::tables::start_customer_session(&state.pool, venue_id, table_id).await?;
    Ok(Json(session))
}

/// POST /api/public/venues/{venue_id}/orders
pub async fn place_order(
    State(state): State<AppState>,
    Path(venue_id): Path<i64>,
    Json(data): Json<OrderCreate>,
) -> ApiResult<PublicOrder> {
    active_venue(&state, venue_id).await?;
    data.validate()?;
    let order = db::orders::place(&state.pool, venue_id, &data).await?;
    Ok(Json(order.into()))
}

/// GET /api/public/orders/{order_id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> ApiResult<PublicOrder> {
    let order = db::orders::find_by_id(&state.pool, order_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| order_not_found(order_id))?;
    Ok(Json(order.into()))
}

/// POST /api/public/orders/{order_id}/checkout
///
/// The order is marked paid by the `checkout.session.completed` webhook,
/// never by the redirect.
pub async fn create_checkout(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> ApiResult<CheckoutResponse> {
    let order = db::orders::find_by_id(&state.pool, order_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| order_not_found(order_id))?;
    check_checkout(&order)?;
    let venue = active_venue(&state, order.venue_id).await?;

    let session = stripe::create_checkout_session(
        &state.http,
        &state.stripe_secret_key,
        &order,
        &venue.currency,
        &state.checkout_success_url,
        &state.checkout_cancel_url,
    )
    .await
    .map_err(|e| {
        tracing::error!(order_id, error = %e, "Stripe checkout creation failed");
        AppError::with_message(ErrorCode::PaymentFailed, "Could not start the payment")
    })?;

    db::orders::set_checkout_session(&state.pool, order_id, &session.id)
        .await
        .map_err(internal)?;
    tracing::info!(order_id, session_id = %session.id, "Checkout session created");

    Ok(Json(CheckoutResponse {
        checkout_url: session.url,
        session_id: session.id,
    }))
}

/// POST /api/public/venues/{venue_id}/feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(venue_id): Path<i64>,
    Json(data): Json<FeedbackCreate>,
) -> ApiResult<Feedback> {
    active_venue(&state, venue_id).await?;
    data.validate()?;
    let feedback = db::feedback::create(&state.pool, venue_id, &data)
        .await
        .map_err(internal)?;
    Ok(Json(feedback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::payment::QrType;

    fn order(method: PaymentMethod, status: OrderStatus, payment: PaymentStatus) -> Order {
        Order {
            id: 7,
            venue_id: 1,
            table_id: None,
            session_id: None,
            qr_type: QrType::Counter,
            payment_method: method,
            status,
            payment_status: payment,
            items: vec![],
            total_amount: Decimal::new(1250, 2),
            customer_name: None,
            notes: None,
            stripe_session_id: None,
            payment_intent_id: None,
            paid_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn checkout_only_for_unpaid_pay_now_orders() {
        use OrderStatus::*;
        use PaymentMethod::*;
        use PaymentStatus::*;

        assert!(check_checkout(&order(PayNow, Placed, Unpaid)).is_ok());
        for o in [
            order(PayAtTill, Placed, Unpaid),
            order(PayNow, Placed, Paid),
            order(PayNow, Cancelled, Unpaid),
        ] {
            assert_eq!(
                check_checkout(&o).unwrap_err().code,
                ErrorCode::CheckoutUnavailable
            );
        }
    }
}
