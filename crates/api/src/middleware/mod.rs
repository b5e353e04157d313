//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated caller from a JWT Bearer token.
//! - [`rbac::RequireDispatcher`] -- Requires the `service` or `admin` role.

pub mod auth;
pub mod rbac;
