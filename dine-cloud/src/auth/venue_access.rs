//! Venue membership checks
//!
//! Tenant isolation: every staff route is scoped by `venue_id`, and the
//! caller must hold a role in that venue whose permission set covers the
//! action.

use shared::error::{AppError, ErrorCode};
use shared::staff::VenueRole;

use super::UserIdentity;
use crate::db;
use crate::error::internal;
use crate::state::AppState;

/// Caller's resolved access to one venue
#[derive(Debug, Clone)]
pub struct VenueAccess {
    pub venue_id: i64,
    pub user_id: String,
    pub role: VenueRole,
}

impl VenueAccess {
    pub fn can(&self, permission: &str) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require(&self, permission: &str) -> Result<(), AppError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(
                AppError::forbidden(format!("{} role lacks {permission}", self.role))
                    .with_detail("permission", permission),
            )
        }
    }
}

/// Resolve the caller's role in `venue_id`
pub async fn venue_access(
    state: &AppState,
    venue_id: i64,
    identity: &UserIdentity,
) -> Result<VenueAccess, AppError> {
    let role = db::members::role_of(&state.pool, venue_id, &identity.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::VenueAccessDenied, "No access to this venue")
                .with_detail("venue_id", venue_id)
        })?;

    Ok(VenueAccess {
        venue_id,
        user_id: identity.user_id.clone(),
        role,
    })
}

/// Resolve access and require `permission` in one step
pub async fn require_venue(
    state: &AppState,
    venue_id: i64,
    identity: &UserIdentity,
    permission: &str,
) -> Result<VenueAccess, AppError> {
    let access = venue_access(state, venue_id, identity).await?;
    access.require(permission)?;
    Ok(access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::staff::permissions;

    #[test]
    fn require_reports_missing_permission() {
        let access = VenueAccess {
            venue_id: 1,
            user_id: "u".into(),
            role: VenueRole::Kitchen,
        };
        assert!(access.require(permissions::KDS_OPERATE).is_ok());
        let err = access.require(permissions::PAYMENTS_REFUND).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.message, "KITCHEN role lacks payments:refund");
    }
}
