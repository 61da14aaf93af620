//! Data models
//!
//! Row types mirror the Postgres tables of `dine-cloud`.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are snowflake `i64`, timestamps are Unix millis, user ids are the
//! external auth subject (`String`).

pub mod analytics;
pub mod bill_split;
pub mod daily_reset;
pub mod feedback;
pub mod kds;
pub mod member;
pub mod menu_item;
pub mod order;
pub mod reservation;
pub mod table;
pub mod venue;

// Re-exports
pub use analytics::*;
pub use bill_split::*;
pub use daily_reset::*;
pub use feedback::*;
pub use kds::*;
pub use member::*;
pub use menu_item::*;
pub use order::*;
pub use reservation::*;
pub use table::*;
pub use venue::*;
