//! Database access layer
//!
//! Plain functions over `&PgPool` (or a transaction connection). Single
//! statements return `sqlx::Error`; multi-step operations that enforce
//! business rules run in one transaction and return `ServiceError`.

pub mod analytics;
pub mod assistant;
pub mod bill_splits;
pub mod daily_reset;
pub mod feedback;
pub mod kds;
pub mod members;
pub mod menu;
pub mod orders;
pub mod reservations;
pub mod tables;
pub mod venues;
pub mod webhooks;
