//! Table session state machine
//!
//! A table has at most one open session. `FREE` is only ever a closed
//! session (or no session at all); the database keeps the invariant with a
//! partial unique index on open sessions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::status::{OrderStatus, PaymentStatus};
use crate::error::{AppError, ErrorCode};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableSessionStatus {
    #[default]
    Free,
    Ordering,
    Occupied,
}

impl TableSessionStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Ordering => "ORDERING",
            Self::Occupied => "OCCUPIED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "FREE" => Some(Self::Free),
            "ORDERING" => Some(Self::Ordering),
            "OCCUPIED" => Some(Self::Occupied),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: TableSessionStatus) -> bool {
        use TableSessionStatus::*;
        matches!(
            (*self, next),
            (Free, Ordering)
                | (Free, Occupied)
                | (Ordering, Occupied)
                | (Ordering, Free)
                | (Occupied, Free)
        )
    }
}

text_codec!(TableSessionStatus);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot move table from {from} to {to}")]
    InvalidTransition {
        from: TableSessionStatus,
        to: TableSessionStatus,
    },

    #[error("Table has {count} unpaid order(s)")]
    UnpaidOrders { count: usize },
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match &err {
            SessionError::InvalidTransition { .. } => {
                AppError::with_message(ErrorCode::InvalidSessionTransition, err.to_string())
            }
            SessionError::UnpaidOrders { count } => {
                AppError::with_message(ErrorCode::TableHasUnpaidOrders, err.to_string())
                    .with_detail("unpaid_orders", *count)
            }
        }
    }
}

/// What happens to the table's session when an order is placed on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// No open session: open one directly in OCCUPIED
    OpenOccupied,
    /// Open ORDERING session becomes OCCUPIED
    MarkOccupied,
    /// Already OCCUPIED (a second round of orders)
    Unchanged,
}

/// Session effect of placing an order on a table.
///
/// `current` is the open session's status, `None` when the table is free.
pub fn session_after_order_placed(current: Option<TableSessionStatus>) -> SessionAction {
    match current {
        None | Some(TableSessionStatus::Free) => SessionAction::OpenOccupied,
        Some(TableSessionStatus::Ordering) => SessionAction::MarkOccupied,
        Some(TableSessionStatus::Occupied) => SessionAction::Unchanged,
    }
}

/// Whether the session should close after one of its orders settled.
///
/// `remaining` lists the statuses of the session's other orders. Completion
/// already requires payment, so the table frees up once every order is
/// terminal.
pub fn session_closes_after_settle(remaining: &[OrderStatus]) -> bool {
    remaining.iter().all(OrderStatus::is_terminal)
}

/// Orders still open when a table or a business day is closed out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closeout {
    pub complete: Vec<i64>,
    pub cancel: Vec<i64>,
}

/// Settle open orders on close: paid ones complete, the rest are cancelled.
/// Orders already in a terminal state are left alone.
pub fn closeout(orders: &[(i64, OrderStatus, PaymentStatus)]) -> Closeout {
    let mut out = Closeout::default();
    for (id, status, payment) in orders {
        if status.is_terminal() {
            continue;
        }
        if *payment == PaymentStatus::Paid {
            out.complete.push(*id);
        } else {
            out.cancel.push(*id);
        }
    }
    out
}

/// Validate closing a table by staff.
///
/// Unpaid, non-cancelled orders block the close unless `force` is set.
pub fn check_table_close(
    current: TableSessionStatus,
    orders: &[(OrderStatus, PaymentStatus)],
    force: bool,
) -> Result<(), SessionError> {
    if !current.can_transition_to(TableSessionStatus::Free) {
        return Err(SessionError::InvalidTransition {
            from: current,
            to: TableSessionStatus::Free,
        });
    }
    if force {
        return Ok(());
    }
    let unpaid = orders
        .iter()
        .filter(|(status, payment)| {
            *status != OrderStatus::Cancelled && *payment != PaymentStatus::Paid
        })
        .count();
    if unpaid > 0 {
        return Err(SessionError::UnpaidOrders { count: unpaid });
    }
    Ok(())
}

/// Validate seating a party (staff) or a customer starting to order (QR).
pub fn check_seat(current: Option<TableSessionStatus>) -> Result<(), SessionError> {
    match current {
        None | Some(TableSessionStatus::Free) => Ok(()),
        Some(from) => Err(SessionError::InvalidTransition {
            from,
            to: TableSessionStatus::Ordering,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TableSessionStatus::*;

    #[test]
    fn transitions() {
        assert!(Free.can_transition_to(Ordering));
        assert!(Free.can_transition_to(Occupied));
        assert!(Ordering.can_transition_to(Occupied));
        assert!(Ordering.can_transition_to(Free));
        assert!(Occupied.can_transition_to(Free));
        assert!(!Occupied.can_transition_to(Ordering));
        assert!(!Free.can_transition_to(Free));
    }

    #[test]
    fn placing_orders_upgrades_session() {
        assert_eq!(session_after_order_placed(None), SessionAction::OpenOccupied);
        assert_eq!(
            session_after_order_placed(Some(Ordering)),
            SessionAction::MarkOccupied
        );
        assert_eq!(
            session_after_order_placed(Some(Occupied)),
            SessionAction::Unchanged
        );
    }

    #[test]
    fn session_closes_only_when_everything_settled() {
        assert!(session_closes_after_settle(&[]));
        assert!(session_closes_after_settle(&[
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ]));
        assert!(!session_closes_after_settle(&[
            OrderStatus::Completed,
            OrderStatus::Serving,
        ]));
    }

    #[test]
    fn close_blocks_on_unpaid_orders() {
        let orders = [
            (OrderStatus::Serving, PaymentStatus::Unpaid),
            (OrderStatus::Completed, PaymentStatus::Paid),
            (OrderStatus::Cancelled, PaymentStatus::Unpaid),
        ];
        assert_eq!(
            check_table_close(Occupied, &orders, false),
            Err(SessionError::UnpaidOrders { count: 1 })
        );
        assert!(check_table_close(Occupied, &orders, true).is_ok());
        assert!(check_table_close(Ordering, &[], false).is_ok());
        assert!(check_table_close(Free, &[], true).is_err());
    }

    #[test]
    fn seating_requires_free_table() {
        assert!(check_seat(None).is_ok());
        assert!(check_seat(Some(Ordering)).is_err());
        let err: AppError = check_seat(Some(Occupied)).unwrap_err().into();
        assert_eq!(err.code, ErrorCode::InvalidSessionTransition);
    }

    #[test]
    fn closeout_completes_paid_and_cancels_the_rest() {
        let orders = [
            (1, OrderStatus::Serving, PaymentStatus::Paid),
            (2, OrderStatus::Placed, PaymentStatus::Unpaid),
            (3, OrderStatus::Ready, PaymentStatus::Refunded),
            (4, OrderStatus::Completed, PaymentStatus::Paid),
            (5, OrderStatus::Cancelled, PaymentStatus::Unpaid),
            (6, OrderStatus::InPrep, PaymentStatus::Paid),
        ];
        assert_eq!(
            closeout(&orders),
            Closeout {
                complete: vec![1, 6],
                cancel: vec![2, 3],
            }
        );
        assert_eq!(closeout(&[]), Closeout::default());
    }
}
