//! Shared types for the Dine platform
//!
//! Domain models and pure business rules used by `dine-cloud`: the error
//! taxonomy, order and table-session lifecycle, payment rules, kitchen
//! routing, staff permissions, bill splitting and menu import matching.
//!
//! Enable the `db` feature to derive `sqlx::FromRow` on row types and to get
//! TEXT column codecs for the status enums.

#[macro_use]
mod codec;

pub mod billing;
pub mod error;
pub mod kds;
pub mod menu_import;
pub mod models;
pub mod order;
pub mod payment;
pub mod staff;
pub mod types;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
