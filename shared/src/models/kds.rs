//! Kitchen Display Models

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::kds::{StationType, TicketStatus};

/// Kitchen station entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct KdsStation {
    pub id: i64,
    pub venue_id: i64,
    pub name: String,
    pub station_type: StationType,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: i64,
}

/// Create station payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KdsStationCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub station_type: StationType,
    pub display_order: Option<i32>,
}

/// Kitchen ticket (one order line on one station)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct KdsTicket {
    pub id: i64,
    pub venue_id: i64,
    pub order_id: i64,
    pub item_index: i32,
    pub station_id: Option<i64>,
    pub item_name: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub status: TicketStatus,
    pub table_label: Option<String>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub ready_at: Option<i64>,
    pub bumped_at: Option<i64>,
}

/// Ticket list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketListQuery {
    pub station_id: Option<i64>,
    /// Include bumped tickets (default: open tickets only)
    #[serde(default)]
    pub include_bumped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketStatusUpdate {
    pub status: TicketStatus,
}

/// Ticket change result with the order status it caused, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketUpdateResponse {
    pub ticket: KdsTicket,
    pub order_status: Option<crate::order::OrderStatus>,
}

/// Result of creating missing tickets for active orders
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackfillResult {
    pub orders_scanned: usize,
    pub orders_backfilled: usize,
    pub tickets_created: u64,
    pub errors: Vec<BackfillError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillError {
    pub order_id: i64,
    pub error: String,
}
