//! Well-known role name constants carried in access-token claims.

pub const ROLE_ADMIN: &str = "admin";
/// Backend producers allowed to dispatch notifications over HTTP.
pub const ROLE_SERVICE: &str = "service";
