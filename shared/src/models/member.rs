//! Venue Member Model

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::staff::VenueRole;

/// Membership of a user in a venue (`user_venue_roles`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VenueMember {
    pub venue_id: i64,
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: VenueRole,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Add a member payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MemberInvite {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
    pub role: VenueRole,
}

/// Change a member's role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRoleUpdate {
    pub role: VenueRole,
}
