//! Reservation Model

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    #[default]
    Booked,
    CheckedIn,
    Completed,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Booked => "BOOKED",
            Self::CheckedIn => "CHECKED_IN",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "BOOKED" => Some(Self::Booked),
            "CHECKED_IN" => Some(Self::CheckedIn),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            "NO_SHOW" => Some(Self::NoShow),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (*self, next),
            (Booked, CheckedIn) | (Booked, Cancelled) | (Booked, NoShow) | (CheckedIn, Completed)
        )
    }
}

text_codec!(ReservationStatus);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Reservation {
    pub id: i64,
    pub venue_id: i64,
    pub table_id: Option<i64>,
    pub guest_name: String,
    pub phone: Option<String>,
    pub party_size: i32,
    /// Unix millis
    pub starts_at: i64,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReservationCreate {
    pub table_id: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub guest_name: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub party_size: i32,
    pub starts_at: i64,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationStatusUpdate {
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationListQuery {
    /// `YYYY-MM-DD` (UTC); defaults to today
    pub date: Option<String>,
    pub status: Option<ReservationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    #[test]
    fn reservation_transitions() {
        assert!(Booked.can_transition_to(CheckedIn));
        assert!(Booked.can_transition_to(NoShow));
        assert!(CheckedIn.can_transition_to(Completed));
        assert!(!CheckedIn.can_transition_to(NoShow));
        assert!(!Completed.can_transition_to(Booked));
        assert_eq!(ReservationStatus::from_db("NO_SHOW"), Some(NoShow));
    }
}
