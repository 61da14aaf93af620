//! Stripe webhook handler
//!
//! POST /stripe/webhook: order payment events (raw body for signature verification)

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use shared::models::Order;

use crate::db::orders::CheckoutOutcome;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::{db, stripe};

/// Handle incoming Stripe webhook events
///
/// Must receive raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1. Get Stripe-Signature header
    let sig_header = match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("Missing Stripe-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    // 2. Verify signature
    if let Err(e) =
        stripe::verify_webhook_signature(&body, sig_header, &state.stripe_webhook_secret)
    {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    // 3. Parse JSON event
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    let event_id = match event["id"].as_str() {
        Some(id) => id,
        None => {
            tracing::warn!("Webhook event missing id");
            return StatusCode::BAD_REQUEST;
        }
    };
    tracing::info!(event_id, event_type, "Received Stripe webhook");

    // 4. Idempotency: claim the event id before any side effect
    match db::webhooks::claim_event(&state.pool, event_id, event_type).await {
        Ok(false) => {
            tracing::info!(event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        Ok(true) => {}
    }

    // 5. Handle event types
    let status = match event_type {
        "checkout.session.completed" => handle_checkout_completed(&state, &event).await,
        "checkout.session.expired" => handle_checkout_expired(&event),
        "charge.refunded" => handle_charge_refunded(&state, &event).await,
        _ => {
            tracing::debug!(event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    };

    // A failed event must be processed again when Stripe retries it
    if status.is_server_error()
        && let Err(e) = db::webhooks::release_event(&state.pool, event_id).await
    {
        tracing::error!(event_id, %e, "Failed to release webhook event claim");
    }
    status
}

fn event_object(event: &serde_json::Value) -> Option<&serde_json::Value> {
    event.get("data").and_then(|d| d.get("object"))
}

/// checkout.session.completed → order PAID (+ kitchen tickets)
async fn handle_checkout_completed(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let Some(obj) = event_object(event) else {
        return StatusCode::OK;
    };

    let Some(session_id) = obj["id"].as_str() else {
        tracing::warn!("checkout.session.completed missing session id");
        return StatusCode::OK;
    };

    let order_id = obj
        .get("metadata")
        .and_then(|m| m["order_id"].as_str())
        .or_else(|| obj["client_reference_id"].as_str())
        .and_then(|s| s.parse::<i64>().ok());
    let Some(order_id) = order_id else {
        tracing::warn!(session_id, "Checkout session without order_id metadata");
        return StatusCode::OK;
    };

    if obj["payment_status"].as_str().is_some_and(|s| s != "paid") {
        tracing::info!(order_id, session_id, "Checkout completed but not yet paid");
        return StatusCode::OK;
    }

    let payment_intent = obj["payment_intent"].as_str();
    match db::orders::mark_paid_by_checkout(&state.pool, order_id, session_id, payment_intent)
        .await
    {
        Ok(CheckoutOutcome::Paid(order)) => {
            tracing::info!(
                order_id,
                venue_id = order.venue_id,
                session_id,
                "Order paid via Stripe checkout"
            );
            StatusCode::OK
        }
        Ok(CheckoutOutcome::AlreadyPaid) => {
            tracing::info!(order_id, "Order already paid, checkout event ignored");
            StatusCode::OK
        }
        Ok(CheckoutOutcome::Cancelled(order)) => {
            refund_cancelled_checkout(state, &order, session_id, payment_intent).await
        }
        Ok(CheckoutOutcome::NotFound) => {
            tracing::warn!(order_id, session_id, "No order for checkout session");
            StatusCode::OK
        }
        Err(ServiceError::App(e)) => {
            tracing::warn!(order_id, code = ?e.code, message = %e.message, "Checkout payment rejected");
            StatusCode::OK
        }
        Err(ServiceError::Db(e)) => {
            tracing::error!(order_id, %e, "Failed to mark order paid");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// The customer paid for an order that was cancelled meanwhile: give the
/// money back. Stripe refunds are idempotent per order, so a failed step
/// is left for the event retry.
async fn refund_cancelled_checkout(
    state: &AppState,
    order: &Order,
    session_id: &str,
    payment_intent: Option<&str>,
) -> StatusCode {
    let Some(intent) = payment_intent else {
        tracing::error!(
            order_id = order.id,
            session_id,
            "Cancelled order paid without a payment intent, refund manually"
        );
        return StatusCode::OK;
    };

    let refund_id =
        match stripe::create_refund(&state.http, &state.stripe_secret_key, intent, order.id).await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(order_id = order.id, error = %e, "Refund of cancelled order failed");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        };

    if let Err(e) =
        db::orders::record_cancelled_checkout_refund(&state.pool, order.id, session_id, intent).await
    {
        tracing::error!(order_id = order.id, %e, "Failed to record refund of cancelled order");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    tracing::warn!(
        order_id = order.id,
        venue_id = order.venue_id,
        refund_id = %refund_id,
        "Checkout completed for a cancelled order, payment refunded"
    );
    StatusCode::OK
}

/// checkout.session.expired → nothing to undo, the order stays unpaid
fn handle_checkout_expired(event: &serde_json::Value) -> StatusCode {
    if let Some(obj) = event_object(event) {
        tracing::info!(
            session_id = obj["id"].as_str().unwrap_or(""),
            order_id = obj["client_reference_id"].as_str().unwrap_or(""),
            "Checkout session expired"
        );
    }
    StatusCode::OK
}

/// charge.refunded → order REFUNDED
async fn handle_charge_refunded(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let Some(obj) = event_object(event) else {
        return StatusCode::OK;
    };

    let Some(payment_intent) = obj["payment_intent"].as_str() else {
        tracing::warn!("charge.refunded missing payment_intent");
        return StatusCode::OK;
    };

    match db::orders::mark_refunded_by_intent(&state.pool, payment_intent).await {
        Ok(Some(order)) => {
            tracing::info!(
                order_id = order.id,
                venue_id = order.venue_id,
                payment_intent,
                "Order refunded via Stripe"
            );
            StatusCode::OK
        }
        Ok(None) => {
            tracing::info!(payment_intent, "No paid order for refunded charge");
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(%e, "Failed to mark order refunded");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
