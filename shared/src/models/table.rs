//! Table and Table Session Models

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::order::TableSessionStatus;
use crate::payment::QrType;

/// Dining table entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VenueTable {
    pub id: i64,
    pub venue_id: i64,
    /// Unique per venue (case-insensitive)
    pub label: String,
    pub capacity: i32,
    pub qr_type: QrType,
    pub is_active: bool,
    pub created_at: i64,
}

/// Table with its open session, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TableOverview {
    pub id: i64,
    pub label: String,
    pub capacity: i32,
    pub qr_type: QrType,
    pub is_active: bool,
    pub session_id: Option<i64>,
    pub session_status: Option<TableSessionStatus>,
    pub party_size: Option<i32>,
    pub opened_at: Option<i64>,
}

/// Create table payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TableCreate {
    #[validate(length(min = 1, max = 32))]
    pub label: String,
    #[validate(range(min = 1, max = 50))]
    pub capacity: Option<i32>,
    pub qr_type: Option<QrType>,
}

/// Update table payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TableUpdate {
    #[validate(length(min = 1, max = 32))]
    pub label: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub capacity: Option<i32>,
    pub qr_type: Option<QrType>,
    pub is_active: Option<bool>,
}

/// Table session (occupancy of one table)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TableSession {
    pub id: i64,
    pub venue_id: i64,
    pub table_id: i64,
    pub status: TableSessionStatus,
    pub party_size: Option<i32>,
    pub opened_at: i64,
    pub closed_at: Option<i64>,
}

/// Seat a party (staff)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SeatRequest {
    #[validate(range(min = 1, max = 50))]
    pub party_size: Option<i32>,
}

/// Close a table (staff). `force` skips the unpaid-orders check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseTableRequest {
    #[serde(default)]
    pub force: bool,
}
