//! Bill Split Models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::billing::{SplitMode, SplitStatus};
use crate::payment::PaymentMethod;

/// Bill split over one or more orders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BillSplit {
    pub id: i64,
    pub venue_id: i64,
    pub order_ids: Vec<i64>,
    pub mode: SplitMode,
    pub total_amount: Decimal,
    pub status: SplitStatus,
    pub created_by: String,
    pub created_at: i64,
    pub settled_at: Option<i64>,
}

/// One share of a split
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BillShare {
    pub id: i64,
    pub split_id: i64,
    pub share_index: i32,
    pub amount: Decimal,
    pub paid: bool,
    pub payment_method: Option<PaymentMethod>,
    pub paid_at: Option<i64>,
}

/// Create split payload: `parts` for an equal split, `amounts` for custom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillSplitCreate {
    pub order_ids: Vec<i64>,
    pub parts: Option<usize>,
    pub amounts: Option<Vec<Decimal>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharePayRequest {
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillSplitDetail {
    pub split: BillSplit,
    pub shares: Vec<BillShare>,
}
