//! Role-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the minimum requirement.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use voyage_core::error::CoreError;
use voyage_core::roles::{ROLE_ADMIN, ROLE_SERVICE};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `service` or `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn produce(RequireDispatcher(caller): RequireDispatcher) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireDispatcher(pub AuthUser);

impl FromRequestParts<AppState> for RequireDispatcher {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_SERVICE && user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Service or Admin role required".into(),
            )));
        }
        Ok(RequireDispatcher(user))
    }
}
