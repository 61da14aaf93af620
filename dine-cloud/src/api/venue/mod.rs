//! Staff API endpoints, scoped by venue and split into sub-modules by domain

mod analytics;
mod assistant;
mod bill_splits;
mod daily_reset;
mod feedback;
mod kds;
mod menu;
mod orders;
mod reservations;
mod staff;
mod tables;
mod venues;

use chrono::NaiveDate;
use shared::error::AppError;
use shared::util::{parse_business_date, today_utc};

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Business date from a `YYYY-MM-DD` parameter; today (UTC) when absent
pub fn business_date(date: Option<&str>) -> Result<NaiveDate, AppError> {
    match date {
        Some(s) => parse_business_date(s).ok_or_else(|| {
            AppError::validation("date must be YYYY-MM-DD").with_detail("date", s)
        }),
        None => Ok(today_utc()),
    }
}

// Re-export all handlers for route registration
pub use venues::{create_venue, get_venue, list_venues, update_venue};

pub use tables::{close_table, create_table, delete_table, list_tables, seat_table, update_table};

pub use orders::{
    create_order, get_order, list_orders, mark_paid, pay_multiple, refund_order,
    update_order_status,
};

pub use kds::{
    backfill_tickets, bump_ticket, create_station, delete_station, list_stations, list_tickets,
    update_ticket,
};

pub use menu::{
    create_menu_item, delete_menu_item, import_extract, import_match, list_menu, update_menu_item,
};

pub use staff::{invite_member, list_members, remove_member, update_member_role};

pub use bill_splits::{create_split, get_split, pay_share};

pub use feedback::list_feedback;

pub use reservations::{create_reservation, list_reservations, update_reservation_status};

pub use daily_reset::{reset_history, run_daily_reset};

pub use analytics::revenue_summary;

pub use assistant::{execute, plan};

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn business_date_parses_or_defaults_to_today() {
        assert_eq!(
            business_date(Some("2026-03-14")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
        assert_eq!(business_date(None).unwrap(), today_utc());
        assert_eq!(
            business_date(Some("14/03/2026")).unwrap_err().code,
            ErrorCode::ValidationFailed
        );
    }
}
