//! Venue roles and team management rules
//!
//! Roles are fixed per venue membership (`user_venue_roles`). Each role maps
//! to a static permission set; OWNER holds `all`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorCode};
use crate::types::Permission;

/// Permission names checked by handlers and assistant tools
pub mod permissions {
    pub const MENU_MANAGE: &str = "menu:manage";
    pub const TABLES_MANAGE: &str = "tables:manage";
    pub const ORDERS_MANAGE: &str = "orders:manage";
    pub const KDS_OPERATE: &str = "kds:operate";
    pub const PAYMENTS_COLLECT: &str = "payments:collect";
    pub const PAYMENTS_REFUND: &str = "payments:refund";
    pub const STAFF_MANAGE: &str = "staff:manage";
    pub const REPORTS_VIEW: &str = "reports:view";
    pub const ASSISTANT_USE: &str = "assistant:use";
    pub const VENUE_SETTINGS: &str = "venue:settings";

    /// Every grantable permission (OWNER's `all` is not listed)
    pub const ALL_PERMISSIONS: &[&str] = &[
        MENU_MANAGE,
        TABLES_MANAGE,
        ORDERS_MANAGE,
        KDS_OPERATE,
        PAYMENTS_COLLECT,
        PAYMENTS_REFUND,
        STAFF_MANAGE,
        REPORTS_VIEW,
        ASSISTANT_USE,
        VENUE_SETTINGS,
    ];

    pub const OWNER_PERMISSIONS: &[&str] = &["all"];

    pub const MANAGER_PERMISSIONS: &[&str] = &[
        MENU_MANAGE,
        TABLES_MANAGE,
        ORDERS_MANAGE,
        KDS_OPERATE,
        PAYMENTS_COLLECT,
        PAYMENTS_REFUND,
        STAFF_MANAGE,
        REPORTS_VIEW,
        ASSISTANT_USE,
    ];

    pub const SERVER_PERMISSIONS: &[&str] = &[TABLES_MANAGE, ORDERS_MANAGE, PAYMENTS_COLLECT];

    pub const KITCHEN_PERMISSIONS: &[&str] = &[KDS_OPERATE];

    pub const CASHIER_PERMISSIONS: &[&str] = &[ORDERS_MANAGE, PAYMENTS_COLLECT];

    pub const STAFF_PERMISSIONS: &[&str] = &[];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VenueRole {
    Owner,
    Manager,
    Server,
    Kitchen,
    Cashier,
    #[default]
    Staff,
}

impl VenueRole {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Manager => "MANAGER",
            Self::Server => "SERVER",
            Self::Kitchen => "KITCHEN",
            Self::Cashier => "CASHIER",
            Self::Staff => "STAFF",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "OWNER" => Some(Self::Owner),
            "MANAGER" => Some(Self::Manager),
            "SERVER" => Some(Self::Server),
            "KITCHEN" => Some(Self::Kitchen),
            "CASHIER" => Some(Self::Cashier),
            "STAFF" => Some(Self::Staff),
            _ => None,
        }
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Self::Owner => permissions::OWNER_PERMISSIONS,
            Self::Manager => permissions::MANAGER_PERMISSIONS,
            Self::Server => permissions::SERVER_PERMISSIONS,
            Self::Kitchen => permissions::KITCHEN_PERMISSIONS,
            Self::Cashier => permissions::CASHIER_PERMISSIONS,
            Self::Staff => permissions::STAFF_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, action: &str) -> bool {
        self.permissions()
            .iter()
            .any(|p| Permission((*p).to_string()).grants(action))
    }

    /// Owners and managers (the "management" tier)
    pub fn is_management(&self) -> bool {
        matches!(self, Self::Owner | Self::Manager)
    }
}

text_codec!(VenueRole);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StaffError {
    #[error("Missing permission: {0}")]
    MissingPermission(&'static str),

    #[error("You cannot remove yourself from the venue")]
    CannotRemoveSelf,

    #[error("Managers cannot change owners or other managers")]
    ManagerCannotManageManagement,

    #[error("Only owners can grant or revoke the owner role")]
    OwnerRequired,

    #[error("The venue must keep at least one owner")]
    LastOwner,

    #[error("Role is unchanged")]
    RoleUnchanged,
}

impl From<StaffError> for AppError {
    fn from(err: StaffError) -> Self {
        let code = match &err {
            StaffError::MissingPermission(_) => ErrorCode::PermissionDenied,
            StaffError::CannotRemoveSelf => ErrorCode::CannotRemoveSelf,
            StaffError::ManagerCannotManageManagement | StaffError::RoleUnchanged => {
                ErrorCode::RoleChangeNotAllowed
            }
            StaffError::OwnerRequired => ErrorCode::OwnerRequired,
            StaffError::LastOwner => ErrorCode::LastOwner,
        };
        AppError::with_message(code, err.to_string())
    }
}

/// A membership as seen by the rules: who and with which role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member<'a> {
    pub user_id: &'a str,
    pub role: VenueRole,
}

fn require_staff_manage(actor: VenueRole) -> Result<(), StaffError> {
    if actor.has_permission(permissions::STAFF_MANAGE) {
        Ok(())
    } else {
        Err(StaffError::MissingPermission(permissions::STAFF_MANAGE))
    }
}

/// Validate removing `target` from the venue.
///
/// `owner_count` is the current number of owners, read under lock.
pub fn check_member_removal(
    actor: Member<'_>,
    target: Member<'_>,
    owner_count: i64,
) -> Result<(), StaffError> {
    require_staff_manage(actor.role)?;
    if actor.user_id == target.user_id {
        return Err(StaffError::CannotRemoveSelf);
    }
    if actor.role != VenueRole::Owner && target.role.is_management() {
        return Err(StaffError::ManagerCannotManageManagement);
    }
    if target.role == VenueRole::Owner && owner_count <= 1 {
        return Err(StaffError::LastOwner);
    }
    Ok(())
}

/// Validate changing `target`'s role to `new_role`.
pub fn check_role_change(
    actor: Member<'_>,
    target: Member<'_>,
    new_role: VenueRole,
    owner_count: i64,
) -> Result<(), StaffError> {
    require_staff_manage(actor.role)?;
    if target.role == new_role {
        return Err(StaffError::RoleUnchanged);
    }
    let touches_owner = target.role == VenueRole::Owner || new_role == VenueRole::Owner;
    if touches_owner && actor.role != VenueRole::Owner {
        return Err(StaffError::OwnerRequired);
    }
    if actor.role != VenueRole::Owner
        && (target.role == VenueRole::Manager || new_role == VenueRole::Manager)
    {
        return Err(StaffError::ManagerCannotManageManagement);
    }
    if target.role == VenueRole::Owner && owner_count <= 1 {
        return Err(StaffError::LastOwner);
    }
    Ok(())
}

/// Validate inviting a new member with `role`.
pub fn check_invite(actor: VenueRole, role: VenueRole) -> Result<(), StaffError> {
    require_staff_manage(actor)?;
    match (actor, role) {
        (VenueRole::Owner, _) => Ok(()),
        (_, VenueRole::Owner) => Err(StaffError::OwnerRequired),
        (_, VenueRole::Manager) => Err(StaffError::ManagerCannotManageManagement),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VenueRole::*;

    fn m(user_id: &str, role: VenueRole) -> Member<'_> {
        Member { user_id, role }
    }

    #[test]
    fn role_permissions() {
        for p in permissions::ALL_PERMISSIONS {
            assert!(Owner.has_permission(p), "owner lacks {p}");
        }
        assert!(Manager.has_permission(permissions::STAFF_MANAGE));
        assert!(!Manager.has_permission(permissions::VENUE_SETTINGS));
        assert!(Kitchen.has_permission(permissions::KDS_OPERATE));
        assert!(!Kitchen.has_permission(permissions::PAYMENTS_COLLECT));
        assert!(Cashier.has_permission(permissions::PAYMENTS_COLLECT));
        assert!(!Cashier.has_permission(permissions::PAYMENTS_REFUND));
        assert!(!Staff.has_permission(permissions::ORDERS_MANAGE));
    }

    #[test]
    fn role_db_strings() {
        for role in [Owner, Manager, Server, Kitchen, Cashier, Staff] {
            assert_eq!(VenueRole::from_db(role.as_db()), Some(role));
        }
        assert_eq!(VenueRole::from_db("admin"), None);
    }

    #[test]
    fn removal_rules() {
        assert!(check_member_removal(m("a", Owner), m("b", Manager), 1).is_ok());
        assert!(check_member_removal(m("a", Manager), m("b", Server), 1).is_ok());
        assert_eq!(
            check_member_removal(m("a", Owner), m("a", Owner), 2),
            Err(StaffError::CannotRemoveSelf)
        );
        assert_eq!(
            check_member_removal(m("a", Manager), m("b", Manager), 1),
            Err(StaffError::ManagerCannotManageManagement)
        );
        assert_eq!(
            check_member_removal(m("a", Server), m("b", Staff), 1),
            Err(StaffError::MissingPermission(permissions::STAFF_MANAGE))
        );
        assert!(check_member_removal(m("a", Owner), m("b", Owner), 2).is_ok());
    }

    #[test]
    fn last_owner_is_protected() {
        assert_eq!(
            check_member_removal(m("a", Owner), m("b", Owner), 1),
            Err(StaffError::LastOwner)
        );
        assert_eq!(
            check_role_change(m("a", Owner), m("b", Owner), Manager, 1),
            Err(StaffError::LastOwner)
        );
        let err: AppError = StaffError::LastOwner.into();
        assert_eq!(err.code, ErrorCode::LastOwner);
        assert_eq!(err.http_status(), http::StatusCode::CONFLICT);
    }

    #[test]
    fn role_change_rules() {
        assert!(check_role_change(m("a", Owner), m("b", Server), Owner, 1).is_ok());
        assert!(check_role_change(m("a", Owner), m("b", Owner), Manager, 2).is_ok());
        assert!(check_role_change(m("a", Manager), m("b", Server), Kitchen, 1).is_ok());
        assert_eq!(
            check_role_change(m("a", Manager), m("b", Server), Owner, 1),
            Err(StaffError::OwnerRequired)
        );
        assert_eq!(
            check_role_change(m("a", Manager), m("b", Server), Manager, 1),
            Err(StaffError::ManagerCannotManageManagement)
        );
        assert_eq!(
            check_role_change(m("a", Manager), m("b", Manager), Staff, 1),
            Err(StaffError::ManagerCannotManageManagement)
        );
        assert_eq!(
            check_role_change(m("a", Owner), m("b", Server), Server, 1),
            Err(StaffError::RoleUnchanged)
        );
    }

    #[test]
    fn invite_rules() {
        assert!(check_invite(Owner, Owner).is_ok());
        assert!(check_invite(Owner, Manager).is_ok());
        assert!(check_invite(Manager, Cashier).is_ok());
        assert_eq!(check_invite(Manager, Owner), Err(StaffError::OwnerRequired));
        assert_eq!(
            check_invite(Manager, Manager),
            Err(StaffError::ManagerCannotManageManagement)
        );
        assert!(check_invite(Kitchen, Staff).is_err());
    }
}
