//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use voyage_core::error::CoreError;
use voyage_core::roles::ROLE_ADMIN;
use voyage_core::types::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller extracted from a JWT Bearer token in the `Authorization` header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The caller's user id (from `claims.sub`).
    pub user_id: UserId,
    /// The caller's role name (e.g. `"admin"`, `"service"`, `"user"`).
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Allow access to resources owned by `owner`: the owner or an admin.
    pub fn ensure_can_access(&self, owner: &str) -> Result<(), AppError> {
        if self.user_id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "Not allowed to access another user's notifications".into(),
            )))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = state.config.jwt.verify(token).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn user(id: &str, role: &str) -> AuthUser {
        AuthUser {
            user_id: id.to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn owner_and_admin_can_access() {
        assert!(user("guest-1", "user").ensure_can_access("guest-1").is_ok());
        assert!(user("ops", "admin").ensure_can_access("guest-1").is_ok());
    }

    #[test]
    fn other_users_are_forbidden() {
        assert_matches!(
            user("guest-2", "user").ensure_can_access("guest-1"),
            Err(AppError::Core(CoreError::Forbidden(_)))
        );
    }
}
