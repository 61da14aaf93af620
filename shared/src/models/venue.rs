//! Venue and Organization Models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Organization owning one or more venues
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub owner_user_id: String,
    pub created_at: i64,
}

/// Venue entity (tenant)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Venue {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub slug: String,
    /// ISO 4217, lowercase (Stripe convention)
    pub currency: String,
    pub timezone: String,
    /// Hour (UTC) after which the automatic daily reset runs
    pub reset_hour_utc: i32,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Venue as listed for a staff member, with their role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VenueSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub role: crate::staff::VenueRole,
    pub is_active: bool,
}

/// Create venue payload
///
/// A new organization is created when `organization_id` is absent; the
/// caller becomes OWNER either way.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VenueCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 2, max = 64))]
    pub slug: String,
    pub organization_id: Option<i64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub timezone: Option<String>,
    #[validate(range(min = 0, max = 23))]
    pub reset_hour_utc: Option<i32>,
}

/// Update venue payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VenueUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub timezone: Option<String>,
    #[validate(range(min = 0, max = 23))]
    pub reset_hour_utc: Option<i32>,
    pub is_active: Option<bool>,
}
