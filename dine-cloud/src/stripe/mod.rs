//! Stripe integration via REST API (no SDK dependency)

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sha2::Sha256;
use shared::models::Order;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const STRIPE_API: &str = "https://api.stripe.com/v1";

/// Checkout Session created for one order
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Amount in the currency's minor unit (cents)
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

/// Form fields of a payment-mode Checkout Session for `order`
fn checkout_form(
    order: &Order,
    currency: &str,
    success_url: &str,
    cancel_url: &str,
) -> Result<Vec<(String, String)>, BoxError> {
    let order_id = order.id.to_string();
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        (
            "success_url".to_string(),
            success_url.replace("{ORDER_ID}", &order_id),
        ),
        (
            "cancel_url".to_string(),
            cancel_url.replace("{ORDER_ID}", &order_id),
        ),
        ("client_reference_id".to_string(), order_id.clone()),
        ("metadata[order_id]".to_string(), order_id.clone()),
        ("metadata[venue_id]".to_string(), order.venue_id.to_string()),
        (
            "payment_intent_data[metadata][order_id]".to_string(),
            order_id,
        ),
    ];

    for (i, item) in order.items.iter().enumerate() {
        let unit_amount = to_minor_units(item.unit_price)
            .filter(|cents| *cents >= 0)
            .ok_or_else(|| format!("Invalid unit price for {}", item.name))?;
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            currency.to_lowercase(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    Ok(form)
}

/// Create a Stripe Checkout Session (payment mode) for a PAY_NOW order
pub async fn create_checkout_session(
    http: &reqwest::Client,
    secret_key: &str,
    order: &Order,
    currency: &str,
    success_url: &str,
    cancel_url: &str,
) -> Result<CheckoutSession, BoxError> {
    let form = checkout_form(order, currency, success_url, cancel_url)?;
    let resp: serde_json::Value = http
        .post(format!("{STRIPE_API}/checkout/sessions"))
        .basic_auth(secret_key, None::<&str>)
        .header("Idempotency-Key", format!("checkout-{}", order.id))
        .form(&form)
        .send()
        .await?
        .json()
        .await?;

    match (resp["id"].as_str(), resp["url"].as_str()) {
        (Some(id), Some(url)) => Ok(CheckoutSession {
            id: id.to_string(),
            url: url.to_string(),
        }),
        _ => Err(format!("Stripe create_checkout failed: {resp}").into()),
    }
}

/// Refund a captured PaymentIntent in full
pub async fn create_refund(
    http: &reqwest::Client,
    secret_key: &str,
    payment_intent: &str,
    order_id: i64,
) -> Result<String, BoxError> {
    let order_id = order_id.to_string();
    let resp: serde_json::Value = http
        .post(format!("{STRIPE_API}/refunds"))
        .basic_auth(secret_key, None::<&str>)
        .header("Idempotency-Key", format!("refund-{order_id}"))
        .form(&[
            ("payment_intent", payment_intent),
            ("metadata[order_id]", order_id.as_str()),
        ])
        .send()
        .await?
        .json()
        .await?;

    resp["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| format!("Stripe create_refund failed: {resp}").into())
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe sends one v1 entry per active secret during rotation
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

/// Compute a `Stripe-Signature` header value (tests and local tooling)
#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderItem;
    use shared::order::{OrderStatus, PaymentStatus};
    use shared::payment::{PaymentMethod, QrType};

    const SECRET: &str = "whsec_test";

    #[test]
    fn valid_signature_is_accepted() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign_payload(payload, SECRET, 1_700_000_000);
        assert!(verify_webhook_signature_at(payload, &header, SECRET, 1_700_000_010).is_ok());
    }

    #[test]
    fn tampered_payload_or_wrong_secret_is_rejected() {
        let header = sign_payload(b"original", SECRET, 1_700_000_000);
        assert_eq!(
            verify_webhook_signature_at(b"tampered", &header, SECRET, 1_700_000_000),
            Err("Webhook signature mismatch")
        );
        assert_eq!(
            verify_webhook_signature_at(b"original", &header, "other", 1_700_000_000),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let header = sign_payload(b"{}", SECRET, 1_700_000_000);
        assert_eq!(
            verify_webhook_signature_at(b"{}", &header, SECRET, 1_700_000_301),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn any_matching_v1_entry_is_enough() {
        let good = sign_payload(b"{}", SECRET, 1_700_000_000);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1=deadbeef,v1={good_sig}");
        assert!(verify_webhook_signature_at(b"{}", &header, SECRET, 1_700_000_000).is_ok());
        assert_eq!(
            verify_webhook_signature_at(b"{}", "v1=abc", SECRET, 0),
            Err("Invalid Stripe-Signature header")
        );
    }

    #[test]
    fn minor_units_round_half_away() {
        assert_eq!(to_minor_units(Decimal::new(1250, 2)), Some(1250));
        assert_eq!(to_minor_units(Decimal::new(9995, 3)), Some(1000));
    }

    #[test]
    fn checkout_form_has_line_items_and_metadata() {
        let order = Order {
            id: 42,
            venue_id: 7,
            table_id: None,
            session_id: None,
            qr_type: QrType::Counter,
            payment_method: PaymentMethod::PayNow,
            status: OrderStatus::Placed,
            payment_status: PaymentStatus::Unpaid,
            items: vec![OrderItem {
                menu_item_id: 1,
                name: "Flat White".into(),
                quantity: 2,
                unit_price: Decimal::new(450, 2),
                category: None,
                notes: None,
            }],
            total_amount: Decimal::new(900, 2),
            customer_name: None,
            notes: None,
            stripe_session_id: None,
            payment_intent_id: None,
            paid_at: None,
            created_at: 0,
            updated_at: 0,
        };
        let form = checkout_form(&order, "EUR", "https://x/ok/{ORDER_ID}", "https://x/no").unwrap();
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("success_url"), Some("https://x/ok/42"));
        assert_eq!(get("metadata[order_id]"), Some("42"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("450"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
    }
}
