//! Authentication and access control for staff and public routes

pub mod rate_limit;
pub mod venue_access;
pub mod venue_auth;

pub use rate_limit::RateLimiter;
pub use venue_access::{VenueAccess, require_venue, venue_access};
pub use venue_auth::UserIdentity;
