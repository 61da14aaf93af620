//! Order and table-session lifecycle
//!
//! Pure decision functions; handlers load the rows they act on under
//! `FOR UPDATE`, ask these functions, then write the outcome in the same
//! transaction.

pub mod session;
pub mod status;

pub use session::{
    Closeout, SessionAction, SessionError, TableSessionStatus, check_seat, check_table_close, closeout,
    session_after_order_placed, session_closes_after_settle,
};
pub use status::{
    CheckoutAction, LifecycleError, OrderStatus, PaymentStatus, check_mark_paid, check_refund,
    check_status_transition, checkout_action, is_kitchen_eligible, refund_already_recorded,
};
