//! Daily Reset Models

use serde::{Deserialize, Serialize};

/// Source of a reset run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResetTrigger {
    #[default]
    Manual,
    Scheduled,
}

impl ResetTrigger {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Scheduled => "SCHEDULED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "MANUAL" => Some(Self::Manual),
            "SCHEDULED" => Some(Self::Scheduled),
            _ => None,
        }
    }
}

text_codec!(ResetTrigger);

/// `daily_reset_log` row; one per venue per business date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DailyResetLog {
    pub venue_id: i64,
    pub reset_date: String,
    pub triggered_by: ResetTrigger,
    pub orders_completed: i64,
    pub orders_cancelled: i64,
    pub reservations_no_show: i64,
    pub reservations_completed: i64,
    pub sessions_closed: i64,
    pub tickets_bumped: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyResetRequest {
    /// `YYYY-MM-DD` (UTC); defaults to today
    pub date: Option<String>,
}

/// Outcome of one reset call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyResetSummary {
    pub venue_id: i64,
    pub reset_date: String,
    /// Already reset for this date; nothing was changed
    pub skipped: bool,
    pub orders_completed: i64,
    pub orders_cancelled: i64,
    pub reservations_no_show: i64,
    pub reservations_completed: i64,
    pub sessions_closed: i64,
    pub tickets_bumped: i64,
}

impl DailyResetSummary {
    /// A run that found the date already reset
    pub fn skipped(venue_id: i64, reset_date: String) -> Self {
        Self {
            venue_id,
            reset_date,
            skipped: true,
            ..Default::default()
        }
    }
}
