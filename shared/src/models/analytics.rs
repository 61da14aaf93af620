//! Analytics Models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    /// Window size in days (1..=90, default 7)
    pub days: Option<i64>,
}

impl AnalyticsQuery {
    pub fn days(&self) -> i64 {
        self.days.unwrap_or(7).clamp(1, 90)
    }
}

/// Revenue summary over a trailing window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub days: i64,
    pub order_count: i64,
    pub paid_order_count: i64,
    pub cancelled_order_count: i64,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub top_items: Vec<TopItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TopItem {
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}
