//! Order status and payment status state machine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorCode};
use crate::payment::PaymentMethod;

/// Kitchen-facing order status
///
/// ```text
/// PLACED ──► ACCEPTED ──► IN_PREP ──► READY ──► SERVING ──► COMPLETED
///   │  └────────────────────►┘          └──────────────────►┘
///   └──────┴─────────┴──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Placed,
    Accepted,
    InPrep,
    Ready,
    Serving,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ACTIVE: [OrderStatus; 5] = [
        OrderStatus::Placed,
        OrderStatus::Accepted,
        OrderStatus::InPrep,
        OrderStatus::Ready,
        OrderStatus::Serving,
    ];

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Placed => "PLACED",
            Self::Accepted => "ACCEPTED",
            Self::InPrep => "IN_PREP",
            Self::Ready => "READY",
            Self::Serving => "SERVING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PLACED" => Some(Self::Placed),
            "ACCEPTED" => Some(Self::Accepted),
            "IN_PREP" => Some(Self::InPrep),
            "READY" => Some(Self::Ready),
            "SERVING" => Some(Self::Serving),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Edges of the lifecycle graph, ignoring payment guards
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Placed, Accepted)
                | (Placed, InPrep)
                | (Placed, Cancelled)
                | (Accepted, InPrep)
                | (Accepted, Cancelled)
                | (InPrep, Ready)
                | (InPrep, Cancelled)
                | (Ready, Serving)
                | (Ready, Completed)
                | (Serving, Completed)
        )
    }
}

text_codec!(OrderStatus);

/// Payment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Paid => "PAID",
            Self::Refunded => "REFUNDED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(Self::Unpaid),
            "PAID" => Some(Self::Paid),
            "REFUNDED" => Some(Self::Refunded),
            _ => None,
        }
    }
}

text_codec!(PaymentStatus);

/// Lifecycle rule violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order has already been completed")]
    AlreadyCompleted,

    #[error("Order has already been cancelled")]
    AlreadyCancelled,

    #[error("Order must be paid before it can be completed")]
    NotPaid,

    #[error("Paid orders must be refunded before they can be cancelled")]
    PaidCannotCancel,

    #[error("Order has already been paid")]
    AlreadyPaid,

    #[error("Only paid orders can be refunded")]
    NotRefundable,

    #[error("Order payment has already been refunded")]
    AlreadyRefunded,
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        let code = match &err {
            LifecycleError::InvalidTransition { .. } => ErrorCode::InvalidStatusTransition,
            LifecycleError::AlreadyCompleted => ErrorCode::OrderAlreadyCompleted,
            LifecycleError::AlreadyCancelled => ErrorCode::OrderAlreadyCancelled,
            LifecycleError::NotPaid => ErrorCode::OrderNotPaid,
            LifecycleError::PaidCannotCancel | LifecycleError::AlreadyPaid => {
                ErrorCode::OrderAlreadyPaid
            }
            LifecycleError::NotRefundable | LifecycleError::AlreadyRefunded => {
                ErrorCode::PaymentNotRefundable
            }
        };
        AppError::with_message(code, err.to_string())
    }
}

fn reject_terminal(status: OrderStatus) -> Result<(), LifecycleError> {
    match status {
        OrderStatus::Completed => Err(LifecycleError::AlreadyCompleted),
        OrderStatus::Cancelled => Err(LifecycleError::AlreadyCancelled),
        _ => Ok(()),
    }
}

/// Validate a staff-requested status change, including payment guards.
pub fn check_status_transition(
    from: OrderStatus,
    to: OrderStatus,
    payment: PaymentStatus,
) -> Result<(), LifecycleError> {
    reject_terminal(from)?;
    if !from.can_transition_to(to) {
        return Err(LifecycleError::InvalidTransition { from, to });
    }
    match to {
        OrderStatus::Completed if payment != PaymentStatus::Paid => Err(LifecycleError::NotPaid),
        OrderStatus::Cancelled if payment == PaymentStatus::Paid => {
            Err(LifecycleError::PaidCannotCancel)
        }
        _ => Ok(()),
    }
}

/// Validate marking an order as paid (till, card terminal, webhook).
pub fn check_mark_paid(status: OrderStatus, payment: PaymentStatus) -> Result<(), LifecycleError> {
    if status == OrderStatus::Cancelled {
        return Err(LifecycleError::AlreadyCancelled);
    }
    match payment {
        PaymentStatus::Paid => Err(LifecycleError::AlreadyPaid),
        PaymentStatus::Refunded => Err(LifecycleError::AlreadyRefunded),
        PaymentStatus::Unpaid => Ok(()),
    }
}

/// Validate a refund request.
pub fn check_refund(payment: PaymentStatus) -> Result<(), LifecycleError> {
    if payment == PaymentStatus::Paid {
        Ok(())
    } else {
        Err(LifecycleError::NotRefundable)
    }
}

/// What a completed online checkout does to the order it paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutAction {
    MarkPaid,
    /// Duplicate completion; the payment is already recorded
    AlreadyPaid,
    /// The order was cancelled while the customer was paying, so the
    /// captured payment has to be returned
    RefundCancelled,
}

/// Decide how to apply a `checkout.session.completed` event.
pub fn checkout_action(
    status: OrderStatus,
    payment: PaymentStatus,
) -> Result<CheckoutAction, LifecycleError> {
    match (status, payment) {
        (_, PaymentStatus::Paid) => Ok(CheckoutAction::AlreadyPaid),
        (OrderStatus::Cancelled, PaymentStatus::Unpaid) => Ok(CheckoutAction::RefundCancelled),
        _ => check_mark_paid(status, payment).map(|()| CheckoutAction::MarkPaid),
    }
}

/// A refund issued through Stripe may already have been recorded by the
/// `charge.refunded` webhook before the staff request writes it.
pub fn refund_already_recorded(
    payment: PaymentStatus,
    order_intent: Option<&str>,
    issued_intent: Option<&str>,
) -> bool {
    payment == PaymentStatus::Refunded && issued_intent.is_some() && order_intent == issued_intent
}

/// Whether the kitchen should see this order.
///
/// Online (PAY_NOW) orders wait for the payment to clear; every other
/// method is trusted to be settled later at the till or the table.
pub fn is_kitchen_eligible(
    status: OrderStatus,
    payment: PaymentStatus,
    method: PaymentMethod,
) -> bool {
    status.is_active()
        && match method {
            PaymentMethod::PayNow => payment == PaymentStatus::Paid,
            PaymentMethod::PayLater | PaymentMethod::PayAtTill => {
                payment != PaymentStatus::Refunded
            }
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn db_strings_round_trip() {
        for status in [Placed, Accepted, InPrep, Ready, Serving, Completed, Cancelled] {
            assert_eq!(OrderStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(OrderStatus::from_db("in_prep"), None);
        assert_eq!(InPrep.to_string(), "IN_PREP");
        assert_eq!(serde_json::to_string(&InPrep).unwrap(), "\"IN_PREP\"");
    }

    #[test]
    fn happy_path_is_allowed() {
        let path = [Placed, Accepted, InPrep, Ready, Serving, Completed];
        for pair in path.windows(2) {
            assert!(
                check_status_transition(pair[0], pair[1], PaymentStatus::Paid).is_ok(),
                "{} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn skips_and_backwards_moves_are_rejected() {
        assert!(check_status_transition(Placed, InPrep, PaymentStatus::Unpaid).is_ok());
        assert!(check_status_transition(Ready, Completed, PaymentStatus::Paid).is_ok());
        assert_eq!(
            check_status_transition(Placed, Ready, PaymentStatus::Unpaid),
            Err(LifecycleError::InvalidTransition {
                from: Placed,
                to: Ready
            })
        );
        assert!(check_status_transition(Ready, InPrep, PaymentStatus::Unpaid).is_err());
        assert!(check_status_transition(Serving, Serving, PaymentStatus::Paid).is_err());
        assert!(check_status_transition(Serving, Cancelled, PaymentStatus::Unpaid).is_err());
    }

    #[test]
    fn terminal_states_report_specific_errors() {
        assert_eq!(
            check_status_transition(Completed, Serving, PaymentStatus::Paid),
            Err(LifecycleError::AlreadyCompleted)
        );
        assert_eq!(
            check_status_transition(Cancelled, Placed, PaymentStatus::Unpaid),
            Err(LifecycleError::AlreadyCancelled)
        );
    }

    #[test]
    fn completion_requires_payment() {
        assert_eq!(
            check_status_transition(Serving, Completed, PaymentStatus::Unpaid),
            Err(LifecycleError::NotPaid)
        );
        assert_eq!(
            check_status_transition(Ready, Completed, PaymentStatus::Refunded),
            Err(LifecycleError::NotPaid)
        );
    }

    #[test]
    fn paid_orders_cannot_be_cancelled() {
        assert_eq!(
            check_status_transition(Placed, Cancelled, PaymentStatus::Paid),
            Err(LifecycleError::PaidCannotCancel)
        );
        assert!(check_status_transition(Placed, Cancelled, PaymentStatus::Refunded).is_ok());
    }

    #[test]
    fn mark_paid_rules() {
        assert!(check_mark_paid(Serving, PaymentStatus::Unpaid).is_ok());
        assert!(check_mark_paid(Completed, PaymentStatus::Unpaid).is_ok());
        assert_eq!(
            check_mark_paid(Placed, PaymentStatus::Paid),
            Err(LifecycleError::AlreadyPaid)
        );
        assert_eq!(
            check_mark_paid(Cancelled, PaymentStatus::Unpaid),
            Err(LifecycleError::AlreadyCancelled)
        );
        assert!(check_refund(PaymentStatus::Paid).is_ok());
        assert!(check_refund(PaymentStatus::Unpaid).is_err());
    }

    #[test]
    fn kitchen_eligibility() {
        assert!(!is_kitchen_eligible(Placed, PaymentStatus::Unpaid, PaymentMethod::PayNow));
        assert!(is_kitchen_eligible(Placed, PaymentStatus::Paid, PaymentMethod::PayNow));
        assert!(is_kitchen_eligible(Placed, PaymentStatus::Unpaid, PaymentMethod::PayLater));
        assert!(is_kitchen_eligible(Accepted, PaymentStatus::Unpaid, PaymentMethod::PayAtTill));
        assert!(!is_kitchen_eligible(Cancelled, PaymentStatus::Unpaid, PaymentMethod::PayLater));
    }

    #[test]
    fn lifecycle_errors_map_to_codes() {
        let err: AppError = LifecycleError::PaidCannotCancel.into();
        assert_eq!(err.code, ErrorCode::OrderAlreadyPaid);
        let err: AppError = LifecycleError::InvalidTransition {
            from: Placed,
            to: Completed,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
        assert_eq!(err.message, "Cannot move order from PLACED to COMPLETED");
    }

    #[test]
    fn checkout_completion_actions() {
        assert_eq!(
            checkout_action(Placed, PaymentStatus::Unpaid),
            Ok(CheckoutAction::MarkPaid)
        );
        assert_eq!(
            checkout_action(InPrep, PaymentStatus::Paid),
            Ok(CheckoutAction::AlreadyPaid)
        );
        assert_eq!(
            checkout_action(Cancelled, PaymentStatus::Unpaid),
            Ok(CheckoutAction::RefundCancelled)
        );
        assert_eq!(
            checkout_action(Cancelled, PaymentStatus::Refunded),
            Err(LifecycleError::AlreadyCancelled)
        );
        assert_eq!(
            checkout_action(Placed, PaymentStatus::Refunded),
            Err(LifecycleError::AlreadyRefunded)
        );
    }

    #[test]
    fn refund_recorded_by_webhook_counts_as_done() {
        assert!(refund_already_recorded(
            PaymentStatus::Refunded,
            Some("pi_1"),
            Some("pi_1")
        ));
        assert!(!refund_already_recorded(
            PaymentStatus::Refunded,
            Some("pi_1"),
            Some("pi_2")
        ));
        assert!(!refund_already_recorded(PaymentStatus::Refunded, None, None));
        assert!(!refund_already_recorded(
            PaymentStatus::Paid,
            Some("pi_1"),
            Some("pi_1")
        ));
    }
}
