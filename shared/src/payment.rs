//! Payment rules
//!
//! The QR code a customer scans decides how service works at that spot, and
//! with it which payment methods make sense.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::error::{AppError, ErrorCode};
use crate::order::{OrderStatus, PaymentStatus};

/// Kind of QR code an order was placed from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QrType {
    /// Staff bring food to the table and can collect payment there
    #[default]
    TableFullService,
    /// Customer orders from the table but collects at the pass
    TableCollection,
    /// Counter / takeaway QR with no table
    Counter,
}

impl QrType {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::TableFullService => "TABLE_FULL_SERVICE",
            Self::TableCollection => "TABLE_COLLECTION",
            Self::Counter => "COUNTER",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "TABLE_FULL_SERVICE" => Some(Self::TableFullService),
            "TABLE_COLLECTION" => Some(Self::TableCollection),
            "COUNTER" => Some(Self::Counter),
            _ => None,
        }
    }

    pub fn requires_table(&self) -> bool {
        !matches!(self, Self::Counter)
    }
}

text_codec!(QrType);

/// How the customer intends to pay
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Online card payment via Stripe Checkout before the kitchen starts
    #[default]
    PayNow,
    /// Pay at the table at the end of the meal
    PayLater,
    /// Pay at the till / counter
    PayAtTill,
}

impl PaymentMethod {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::PayNow => "PAY_NOW",
            Self::PayLater => "PAY_LATER",
            Self::PayAtTill => "PAY_AT_TILL",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PAY_NOW" => Some(Self::PayNow),
            "PAY_LATER" => Some(Self::PayLater),
            "PAY_AT_TILL" => Some(Self::PayAtTill),
            _ => None,
        }
    }
}

text_codec!(PaymentMethod);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentRuleError {
    #[error("{method} is not available for {qr_type} QR codes")]
    MethodNotAllowed {
        method: PaymentMethod,
        qr_type: QrType,
    },

    #[error("{qr_type} orders must be placed from a table")]
    TableRequired { qr_type: QrType },

    #[error("Counter orders cannot be attached to a table")]
    TableNotAllowed,

    #[error("No orders selected")]
    NoOrders,

    #[error("Order {0} was selected more than once")]
    DuplicateOrder(i64),

    #[error("Order {order_id} belongs to another venue")]
    WrongVenue { order_id: i64 },

    #[error("Orders already paid: {0:?}")]
    AlreadyPaid(Vec<i64>),

    #[error("Orders cancelled: {0:?}")]
    Cancelled(Vec<i64>),

    #[error("Orders already refunded: {0:?}")]
    Refunded(Vec<i64>),
}

impl From<PaymentRuleError> for AppError {
    fn from(err: PaymentRuleError) -> Self {
        let message = err.to_string();
        match err {
            PaymentRuleError::MethodNotAllowed { .. } => {
                AppError::with_message(ErrorCode::PaymentInvalidMethod, message)
            }
            PaymentRuleError::TableRequired { .. } | PaymentRuleError::TableNotAllowed => {
                AppError::with_message(ErrorCode::InvalidRequest, message)
            }
            PaymentRuleError::NoOrders | PaymentRuleError::DuplicateOrder(_) => {
                AppError::validation(message)
            }
            PaymentRuleError::WrongVenue { order_id } => {
                AppError::with_message(ErrorCode::OrderNotFound, message)
                    .with_detail("order_id", order_id)
            }
            PaymentRuleError::AlreadyPaid(ids) => {
                AppError::with_message(ErrorCode::OrderAlreadyPaid, message)
                    .with_detail("order_ids", ids)
            }
            PaymentRuleError::Cancelled(ids) => {
                AppError::with_message(ErrorCode::OrderAlreadyCancelled, message)
                    .with_detail("order_ids", ids)
            }
            PaymentRuleError::Refunded(ids) => {
                AppError::with_message(ErrorCode::PaymentNotRefundable, message)
                    .with_detail("order_ids", ids)
            }
        }
    }
}

/// Decision table: which payment methods each QR type accepts.
///
/// | QR type            | PAY_NOW | PAY_LATER | PAY_AT_TILL |
/// |--------------------|---------|-----------|-------------|
/// | TABLE_FULL_SERVICE | yes     | yes       | yes         |
/// | TABLE_COLLECTION   | yes     | no        | yes         |
/// | COUNTER            | yes     | no        | yes         |
pub fn validate_payment_method_for_qr_type(
    method: PaymentMethod,
    qr_type: QrType,
) -> Result<(), PaymentRuleError> {
    match (method, qr_type) {
        (PaymentMethod::PayLater, QrType::TableCollection | QrType::Counter) => {
            Err(PaymentRuleError::MethodNotAllowed { method, qr_type })
        }
        _ => Ok(()),
    }
}

/// Table QR types need a table; counter orders must not carry one.
pub fn validate_order_target(
    qr_type: QrType,
    table_id: Option<i64>,
) -> Result<(), PaymentRuleError> {
    match (qr_type.requires_table(), table_id) {
        (true, None) => Err(PaymentRuleError::TableRequired { qr_type }),
        (false, Some(_)) => Err(PaymentRuleError::TableNotAllowed),
        _ => Ok(()),
    }
}

/// Minimal view of an order for settlement checks
#[derive(Debug, Clone)]
pub struct PayableOrder {
    pub id: i64,
    pub venue_id: i64,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
}

/// Validate settling several orders in one payment; returns the total due.
///
/// Rejections name every offending order so the till can show them all at
/// once instead of failing one at a time.
pub fn validate_pay_multiple(
    venue_id: i64,
    requested: &[i64],
    orders: &[PayableOrder],
) -> Result<Decimal, PaymentRuleError> {
    if requested.is_empty() {
        return Err(PaymentRuleError::NoOrders);
    }
    let mut seen = HashSet::new();
    for id in requested {
        if !seen.insert(*id) {
            return Err(PaymentRuleError::DuplicateOrder(*id));
        }
    }
    for id in requested {
        match orders.iter().find(|o| o.id == *id) {
            Some(order) if order.venue_id == venue_id => {}
            _ => return Err(PaymentRuleError::WrongVenue { order_id: *id }),
        }
    }

    let paid: Vec<i64> = orders
        .iter()
        .filter(|o| o.payment_status == PaymentStatus::Paid)
        .map(|o| o.id)
        .collect();
    if !paid.is_empty() {
        return Err(PaymentRuleError::AlreadyPaid(paid));
    }

    let refunded: Vec<i64> = orders
        .iter()
        .filter(|o| o.payment_status == PaymentStatus::Refunded)
        .map(|o| o.id)
        .collect();
    if !refunded.is_empty() {
        return Err(PaymentRuleError::Refunded(refunded));
    }

    let cancelled: Vec<i64> = orders
        .iter()
        .filter(|o| o.order_status == OrderStatus::Cancelled)
        .map(|o| o.id)
        .collect();
    if !cancelled.is_empty() {
        return Err(PaymentRuleError::Cancelled(cancelled));
    }

    Ok(orders
        .iter()
        .filter(|o| seen.contains(&o.id))
        .map(|o| o.total_amount)
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: i64, status: OrderStatus, payment: PaymentStatus, cents: i64) -> PayableOrder {
        PayableOrder {
            id,
            venue_id: 1,
            order_status: status,
            payment_status: payment,
            total_amount: Decimal::new(cents, 2),
        }
    }

    #[test]
    fn decision_table() {
        use PaymentMethod::*;
        use QrType::*;
        for qr in [TableFullService, TableCollection, Counter] {
            assert!(validate_payment_method_for_qr_type(PayNow, qr).is_ok());
            assert!(validate_payment_method_for_qr_type(PayAtTill, qr).is_ok());
        }
        assert!(validate_payment_method_for_qr_type(PayLater, TableFullService).is_ok());
        assert_eq!(
            validate_payment_method_for_qr_type(PayLater, Counter),
            Err(PaymentRuleError::MethodNotAllowed {
                method: PayLater,
                qr_type: Counter
            })
        );
        let err: AppError = validate_payment_method_for_qr_type(PayLater, TableCollection)
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::PaymentInvalidMethod);
        assert_eq!(
            err.message,
            "PAY_LATER is not available for TABLE_COLLECTION QR codes"
        );
    }

    #[test]
    fn order_target_rules() {
        assert!(validate_order_target(QrType::TableFullService, Some(3)).is_ok());
        assert!(validate_order_target(QrType::Counter, None).is_ok());
        assert_eq!(
            validate_order_target(QrType::TableCollection, None),
            Err(PaymentRuleError::TableRequired {
                qr_type: QrType::TableCollection
            })
        );
        assert_eq!(
            validate_order_target(QrType::Counter, Some(3)),
            Err(PaymentRuleError::TableNotAllowed)
        );
    }

    #[test]
    fn pay_multiple_sums_unpaid_orders() {
        let orders = vec![
            order(1, OrderStatus::Serving, PaymentStatus::Unpaid, 1250),
            order(2, OrderStatus::Completed, PaymentStatus::Unpaid, 800),
        ];
        assert_eq!(
            validate_pay_multiple(1, &[1, 2], &orders),
            Ok(Decimal::new(2050, 2))
        );
    }

    #[test]
    fn pay_multiple_rejects_already_paid_orders() {
        let orders = vec![
            order(1, OrderStatus::Serving, PaymentStatus::Paid, 1250),
            order(2, OrderStatus::Serving, PaymentStatus::Unpaid, 800),
            order(3, OrderStatus::Ready, PaymentStatus::Paid, 500),
        ];
        assert_eq!(
            validate_pay_multiple(1, &[1, 2, 3], &orders),
            Err(PaymentRuleError::AlreadyPaid(vec![1, 3]))
        );
        let err: AppError = PaymentRuleError::AlreadyPaid(vec![1, 3]).into();
        assert_eq!(err.code, ErrorCode::OrderAlreadyPaid);
        assert_eq!(
            err.details.unwrap().get("order_ids").unwrap(),
            &serde_json::json!([1, 3])
        );
    }

    #[test]
    fn pay_multiple_rejects_refunded_orders() {
        let orders = vec![
            order(1, OrderStatus::Completed, PaymentStatus::Refunded, 1250),
            order(2, OrderStatus::Serving, PaymentStatus::Unpaid, 800),
        ];
        assert_eq!(
            validate_pay_multiple(1, &[1, 2], &orders),
            Err(PaymentRuleError::Refunded(vec![1]))
        );
        let err: AppError = PaymentRuleError::Refunded(vec![1]).into();
        assert_eq!(err.code, ErrorCode::PaymentNotRefundable);
        assert_eq!(
            err.details.unwrap().get("order_ids").unwrap(),
            &serde_json::json!([1])
        );
    }

    #[test]
    fn pay_multiple_input_checks() {
        let orders = vec![order(1, OrderStatus::Placed, PaymentStatus::Unpaid, 100)];
        assert_eq!(
            validate_pay_multiple(1, &[], &orders),
            Err(PaymentRuleError::NoOrders)
        );
        assert_eq!(
            validate_pay_multiple(1, &[1, 1], &orders),
            Err(PaymentRuleError::DuplicateOrder(1))
        );
        assert_eq!(
            validate_pay_multiple(1, &[1, 9], &orders),
            Err(PaymentRuleError::WrongVenue { order_id: 9 })
        );
        assert_eq!(
            validate_pay_multiple(2, &[1], &orders),
            Err(PaymentRuleError::WrongVenue { order_id: 1 })
        );
        let cancelled = vec![order(4, OrderStatus::Cancelled, PaymentStatus::Unpaid, 100)];
        assert_eq!(
            validate_pay_multiple(1, &[4], &cancelled),
            Err(PaymentRuleError::Cancelled(vec![4]))
        );
    }
}
