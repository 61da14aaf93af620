//! API routes for dine-cloud

pub mod health;
pub mod public;
pub mod stripe_webhook;
pub mod venue;

use axum::routing::{delete, get, patch, post};
use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use shared::util::snowflake_id;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::{checkout_rate_limit, feedback_rate_limit, orders_rate_limit};
use crate::auth::venue_auth::venue_auth_middleware;
use crate::state::AppState;

const REQUEST_ID: &str = "x-request-id";

/// Snowflake request ids, same generator as row ids
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        Some(RequestId::new(HeaderValue::from(snowflake_id())))
    }
}

/// Staff routes (JWT authenticated, venue role checked per handler)
fn staff_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/venues", get(venue::list_venues).post(venue::create_venue))
        .route(
            "/api/venues/{venue_id}",
            get(venue::get_venue).patch(venue::update_venue),
        )
        // Tables
        .route(
            "/api/venues/{venue_id}/tables",
            get(venue::list_tables).post(venue::create_table),
        )
        .route(
            "/api/venues/{venue_id}/tables/{table_id}",
            patch(venue::update_table).delete(venue::delete_table),
        )
        .route(
            "/api/venues/{venue_id}/tables/{table_id}/seat",
            post(venue::seat_table),
        )
        .route(
            "/api/venues/{venue_id}/tables/{table_id}/close",
            post(venue::close_table),
        )
        // Orders
        .route(
            "/api/venues/{venue_id}/orders",
            get(venue::list_orders).post(venue::create_order),
        )
        .route(
            "/api/venues/{venue_id}/orders/pay-multiple",
            post(venue::pay_multiple),
        )
        .route(
            "/api/venues/{venue_id}/orders/{order_id}",
            get(venue::get_order),
        )
        .route(
            "/api/venues/{venue_id}/orders/{order_id}/status",
            patch(venue::update_order_status),
        )
        .route(
            "/api/venues/{venue_id}/orders/{order_id}/mark-paid",
            post(venue::mark_paid),
        )
        .route(
            "/api/venues/{venue_id}/orders/{order_id}/refund",
            post(venue::refund_order),
        )
        // Kitchen display
        .route(
            "/api/venues/{venue_id}/kds/stations",
            get(venue::list_stations).post(venue::create_station),
        )
        .route(
            "/api/venues/{venue_id}/kds/stations/{station_id}",
            delete(venue::delete_station),
        )
        .route(
            "/api/venues/{venue_id}/kds/tickets",
            get(venue::list_tickets),
        )
        .route(
            "/api/venues/{venue_id}/kds/tickets/{ticket_id}",
            patch(venue::update_ticket),
        )
        .route(
            "/api/venues/{venue_id}/kds/tickets/{ticket_id}/bump",
            post(venue::bump_ticket),
        )
        .route(
            "/api/venues/{venue_id}/kds/backfill",
            post(venue::backfill_tickets),
        )
        // Menu
        .route(
            "/api/venues/{venue_id}/menu",
            get(venue::list_menu).post(venue::create_menu_item),
        )
        .route(
            "/api/venues/{venue_id}/menu/{item_id}",
            patch(venue::update_menu_item).delete(venue::delete_menu_item),
        )
        .route(
            "/api/venues/{venue_id}/menu/import/extract",
            post(venue::import_extract),
        )
        .route(
            "/api/venues/{venue_id}/menu/import/match",
            post(venue::import_match),
        )
        // Staff
        .route(
            "/api/venues/{venue_id}/staff",
            get(venue::list_members).post(venue::invite_member),
        )
        .route(
            "/api/venues/{venue_id}/staff/{user_id}",
            patch(venue::update_member_role).delete(venue::remove_member),
        )
        // Bill splits
        .route(
            "/api/venues/{venue_id}/bill-splits",
            post(venue::create_split),
        )
        .route(
            "/api/venues/{venue_id}/bill-splits/{split_id}",
            get(venue::get_split),
        )
        .route(
            "/api/venues/{venue_id}/bill-splits/{split_id}/shares/{share_id}/pay",
            post(venue::pay_share),
        )
        // Feedback, reservations, reset, analytics
        .route("/api/venues/{venue_id}/feedback", get(venue::list_feedback))
        .route(
            "/api/venues/{venue_id}/reservations",
            get(venue::list_reservations).post(venue::create_reservation),
        )
        .route(
            "/api/venues/{venue_id}/reservations/{reservation_id}/status",
            patch(venue::update_reservation_status),
        )
        .route(
            "/api/venues/{venue_id}/daily-reset",
            get(venue::reset_history).post(venue::run_daily_reset),
        )
        .route(
            "/api/venues/{venue_id}/analytics/summary",
            get(venue::revenue_summary),
        )
        // Assistant
        .route(
            "/api/venues/{venue_id}/assistant/plan",
            post(venue::plan),
        )
        .route(
            "/api/venues/{venue_id}/assistant/execute",
            post(venue::execute),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            venue_auth_middleware,
        ))
}

/// Customer routes (no auth); writes are rate-limited per IP
fn public_router(state: &AppState) -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/api/public/venues/{venue_id}/orders",
            post(public::place_order),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            orders_rate_limit,
        ));

    let feedback = Router::new()
        .route(
            "/api/public/venues/{venue_id}/feedback",
            post(public::submit_feedback),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            feedback_rate_limit,
        ));

    let checkout = Router::new()
        .route(
            "/api/public/orders/{order_id}/checkout",
            post(public::create_checkout),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            checkout_rate_limit,
        ));

    Router::new()
        .route("/api/public/venues/{venue_id}/menu", get(public::get_menu))
        .route(
            "/api/public/venues/{venue_id}/tables/{table_id}/session",
            post(public::start_session),
        )
        .route("/api/public/orders/{order_id}", get(public::get_order))
        .merge(orders)
        .merge(feedback)
        .merge(checkout)
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(staff_router(&state))
        .merge(public_router(&state))
        .merge(webhook)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID,
        )))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(AppState::for_tests())
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID));
    }

    #[tokio::test]
    async fn staff_routes_require_a_token() {
        let response = app()
            .oneshot(Request::get("/api/venues").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn staff_routes_reject_foreign_tokens() {
        let state = AppState::for_tests();
        let token =
            crate::auth::venue_auth::issue_test_token("user-1", "not-the-secret", &state.jwt_audience, 600);
        let response = create_router(state)
            .oneshot(
                Request::get("/api/venues/1/orders")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_rejects_bad_signature() {
        let response = app()
            .oneshot(
                Request::post("/stripe/webhook")
                    .header("stripe-signature", "t=1,v1=deadbeef")
                    .body(Body::from(r#"{"id":"evt_1","type":"charge.refunded"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_requires_signature_header() {
        let response = app()
            .oneshot(
                Request::post("/stripe/webhook")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
