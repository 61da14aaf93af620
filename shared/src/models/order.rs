//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::order::{OrderStatus, PaymentStatus};
use crate::payment::{PaymentMethod, QrType};

/// Order line snapshot (name and price frozen at order time)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub venue_id: i64,
    pub table_id: Option<i64>,
    pub session_id: Option<i64>,
    pub qr_type: QrType,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub stripe_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One requested line of a new order; prices come from the menu
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemInput {
    pub menu_item_id: i64,
    #[validate(range(min = 1, max = 99))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Create order payload (QR customer or POS)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderCreate {
    pub qr_type: QrType,
    pub payment_method: PaymentMethod,
    pub table_id: Option<i64>,
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<OrderItemInput>,
    #[validate(length(max = 100))]
    pub customer_name: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Status change requested by staff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Mark one order paid at the till / table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkPaidRequest {
    /// Defaults to the order's own payment method
    pub payment_method: Option<PaymentMethod>,
}

/// Settle several orders with one payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayMultipleRequest {
    pub order_ids: Vec<i64>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayMultipleResponse {
    pub order_ids: Vec<i64>,
    pub total_amount: Decimal,
    /// Orders that newly qualified for the kitchen after payment
    pub tickets_created: u64,
}

/// Refund a paid order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    pub reason: Option<String>,
}

/// Order list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub active: Option<bool>,
    pub table_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Public (customer) view of an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOrder {
    pub id: i64,
    pub venue_id: i64,
    pub table_id: Option<i64>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub created_at: i64,
}

impl From<Order> for PublicOrder {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            venue_id: o.venue_id,
            table_id: o.table_id,
            status: o.status,
            payment_status: o.payment_status,
            payment_method: o.payment_method,
            items: o.items,
            total_amount: o.total_amount,
            created_at: o.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}
