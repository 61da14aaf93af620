//! Unified error codes for the Dine platform
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Venue errors
//! - 4xxx: Order and kitchen errors
//! - 5xxx: Payment errors
//! - 6xxx: Menu errors
//! - 7xxx: Table errors
//! - 8xxx: Staff errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the frontend can
/// switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Too many requests from one client
    RateLimited = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1002,
    /// Token is invalid
    TokenInvalid = 1003,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// User has no role at this venue
    VenueAccessDenied = 2002,
    /// Owner role required
    OwnerRequired = 2003,

    // ==================== 3xxx: Venue ====================
    /// Venue not found
    VenueNotFound = 3001,
    /// Organization not found
    OrganizationNotFound = 3002,
    /// Venue is inactive
    VenueInactive = 3003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been paid
    OrderAlreadyPaid = 4002,
    /// Order has already been completed
    OrderAlreadyCompleted = 4003,
    /// Order has already been cancelled
    OrderAlreadyCancelled = 4004,
    /// Order status transition not allowed
    InvalidStatusTransition = 4005,
    /// Order has no items
    OrderEmpty = 4006,
    /// Order must be paid first
    OrderNotPaid = 4007,
    /// Order item is invalid
    OrderItemInvalid = 4008,
    /// Kitchen ticket not found
    TicketNotFound = 4101,
    /// Kitchen ticket status transition not allowed
    InvalidTicketTransition = 4102,
    /// Kitchen station not found
    StationNotFound = 4103,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Payment method not valid for this QR type
    PaymentInvalidMethod = 5002,
    /// Payment cannot be refunded
    PaymentNotRefundable = 5003,
    /// Online checkout not available for this order
    CheckoutUnavailable = 5004,
    /// Bill split not found
    SplitNotFound = 5005,
    /// Split amounts do not add up
    SplitAmountMismatch = 5006,
    /// Split share already paid
    ShareAlreadyPaid = 5007,
    /// Webhook payload rejected
    WebhookInvalid = 5008,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item is not available
    MenuItemUnavailable = 6002,
    /// Menu import failed
    MenuImportFailed = 6003,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table label already used at this venue
    TableLabelExists = 7002,
    /// Table is occupied
    TableOccupied = 7003,
    /// Table has unpaid orders
    TableHasUnpaidOrders = 7004,
    /// Table session not found
    SessionNotFound = 7005,
    /// Table session transition not allowed
    InvalidSessionTransition = 7006,
    /// Reservation not found
    ReservationNotFound = 7007,

    // ==================== 8xxx: Staff ====================
    /// Team member not found
    MemberNotFound = 8001,
    /// Team member already exists
    MemberAlreadyExists = 8002,
    /// Venue must keep at least one owner
    LastOwner = 8003,
    /// Cannot remove yourself
    CannotRemoveSelf = 8004,
    /// Role change not allowed
    RoleChangeNotAllowed = 8005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Upstream service (Stripe, LLM) returned an error
    ExternalServiceError = 9101,
    /// Assistant is not configured or returned an unusable plan
    AssistantUnavailable = 9102,
    /// Network error
    NetworkError = 9103,
    /// Timeout error
    TimeoutError = 9104,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::RateLimited => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::VenueAccessDenied => "You do not have access to this venue",
            ErrorCode::OwnerRequired => "Owner role is required",

            // Venue
            ErrorCode::VenueNotFound => "Venue not found",
            ErrorCode::OrganizationNotFound => "Organization not found",
            ErrorCode::VenueInactive => "Venue is inactive",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyPaid => "Order has already been paid",
            ErrorCode::OrderAlreadyCompleted => "Order has already been completed",
            ErrorCode::OrderAlreadyCancelled => "Order has already been cancelled",
            ErrorCode::InvalidStatusTransition => "Order status change is not allowed",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::OrderNotPaid => "Order has not been paid",
            ErrorCode::OrderItemInvalid => "Order item is invalid",
            ErrorCode::TicketNotFound => "Kitchen ticket not found",
            ErrorCode::InvalidTicketTransition => "Kitchen ticket status change is not allowed",
            ErrorCode::StationNotFound => "Kitchen station not found",

            // Payment
            ErrorCode::PaymentFailed => "Payment failed",
            ErrorCode::PaymentInvalidMethod => "Payment method is not valid for this QR code",
            ErrorCode::PaymentNotRefundable => "Payment cannot be refunded",
            ErrorCode::CheckoutUnavailable => "Online checkout is not available for this order",
            ErrorCode::SplitNotFound => "Bill split not found",
            ErrorCode::SplitAmountMismatch => "Split amounts must add up to the bill total",
            ErrorCode::ShareAlreadyPaid => "Split share has already been paid",
            ErrorCode::WebhookInvalid => "Webhook payload rejected",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemUnavailable => "Menu item is not available",
            ErrorCode::MenuImportFailed => "Menu import failed",

            // Table
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableLabelExists => "A table with this label already exists",
            ErrorCode::TableOccupied => "Table is occupied",
            ErrorCode::TableHasUnpaidOrders => "Table has unpaid orders",
            ErrorCode::SessionNotFound => "Table session not found",
            ErrorCode::InvalidSessionTransition => "Table session change is not allowed",
            ErrorCode::ReservationNotFound => "Reservation not found",

            // Staff
            ErrorCode::MemberNotFound => "Team member not found",
            ErrorCode::MemberAlreadyExists => "User is already a member of this venue",
            ErrorCode::LastOwner => "A venue must keep at least one owner",
            ErrorCode::CannotRemoveSelf => "You cannot remove yourself",
            ErrorCode::RoleChangeNotAllowed => "Role change is not allowed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ExternalServiceError => "Upstream service error",
            ErrorCode::AssistantUnavailable => "Assistant is unavailable",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::RateLimited),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::TokenExpired),
            1003 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::VenueAccessDenied),
            2003 => Ok(ErrorCode::OwnerRequired),

            // Venue
            3001 => Ok(ErrorCode::VenueNotFound),
            3002 => Ok(ErrorCode::OrganizationNotFound),
            3003 => Ok(ErrorCode::VenueInactive),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyPaid),
            4003 => Ok(ErrorCode::OrderAlreadyCompleted),
            4004 => Ok(ErrorCode::OrderAlreadyCancelled),
            4005 => Ok(ErrorCode::InvalidStatusTransition),
            4006 => Ok(ErrorCode::OrderEmpty),
            4007 => Ok(ErrorCode::OrderNotPaid),
            4008 => Ok(ErrorCode::OrderItemInvalid),
            4101 => Ok(ErrorCode::TicketNotFound),
            4102 => Ok(ErrorCode::InvalidTicketTransition),
            4103 => Ok(ErrorCode::StationNotFound),

            // Payment
            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::PaymentInvalidMethod),
            5003 => Ok(ErrorCode::PaymentNotRefundable),
            5004 => Ok(ErrorCode::CheckoutUnavailable),
            5005 => Ok(ErrorCode::SplitNotFound),
            5006 => Ok(ErrorCode::SplitAmountMismatch),
            5007 => Ok(ErrorCode::ShareAlreadyPaid),
            5008 => Ok(ErrorCode::WebhookInvalid),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6002 => Ok(ErrorCode::MenuItemUnavailable),
            6003 => Ok(ErrorCode::MenuImportFailed),

            // Table
            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableLabelExists),
            7003 => Ok(ErrorCode::TableOccupied),
            7004 => Ok(ErrorCode::TableHasUnpaidOrders),
            7005 => Ok(ErrorCode::SessionNotFound),
            7006 => Ok(ErrorCode::InvalidSessionTransition),
            7007 => Ok(ErrorCode::ReservationNotFound),

            // Staff
            8001 => Ok(ErrorCode::MemberNotFound),
            8002 => Ok(ErrorCode::MemberAlreadyExists),
            8003 => Ok(ErrorCode::LastOwner),
            8004 => Ok(ErrorCode::CannotRemoveSelf),
            8005 => Ok(ErrorCode::RoleChangeNotAllowed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),
            9101 => Ok(ErrorCode::ExternalServiceError),
            9102 => Ok(ErrorCode::AssistantUnavailable),
            9103 => Ok(ErrorCode::NetworkError),
            9104 => Ok(ErrorCode::TimeoutError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::VenueAccessDenied.code(), 2002);
        assert_eq!(ErrorCode::VenueNotFound.code(), 3001);
        assert_eq!(ErrorCode::OrderAlreadyPaid.code(), 4002);
        assert_eq!(ErrorCode::TicketNotFound.code(), 4101);
        assert_eq!(ErrorCode::PaymentInvalidMethod.code(), 5002);
        assert_eq!(ErrorCode::MenuItemNotFound.code(), 6001);
        assert_eq!(ErrorCode::TableLabelExists.code(), 7002);
        assert_eq!(ErrorCode::LastOwner.code(), 8003);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::InternalError.is_success());
    }

    #[test]
    fn test_try_from_covers_every_variant() {
        let all = [
            ErrorCode::Success,
            ErrorCode::RateLimited,
            ErrorCode::TokenInvalid,
            ErrorCode::OwnerRequired,
            ErrorCode::VenueInactive,
            ErrorCode::OrderItemInvalid,
            ErrorCode::StationNotFound,
            ErrorCode::WebhookInvalid,
            ErrorCode::MenuImportFailed,
            ErrorCode::ReservationNotFound,
            ErrorCode::RoleChangeNotAllowed,
            ErrorCode::TimeoutError,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
        assert_eq!(ErrorCode::try_from(4100), Err(InvalidErrorCode(4100)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");

        let code: ErrorCode = serde_json::from_str("7002").unwrap();
        assert_eq!(code, ErrorCode::TableLabelExists);

        let result: Result<ErrorCode, _> = serde_json::from_str("999");
        assert!(result.is_err());
    }

    #[test]
    fn test_display_and_message() {
        assert_eq!(format!("{}", ErrorCode::NotFound), "3");
        assert_eq!(ErrorCode::OrderNotFound.message(), "Order not found");
        assert_eq!(
            ErrorCode::LastOwner.message(),
            "A venue must keep at least one owner"
        );
        assert_eq!(
            format!("{}", InvalidErrorCode(999)),
            "invalid error code: 999"
        );
    }
}
