//! Handler for delivery analytics reports.

use axum::extract::{Query, State};
use axum::Json;
use voyage_core::analytics::AnalyticsReport;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::AnalyticsParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/notifications/analytics
///
/// Without `user_id`, regular callers get their own report and admins get the
/// platform-wide one. Naming another user requires the admin role.
pub async fn get_analytics(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> AppResult<Json<DataResponse<AnalyticsReport>>> {
    let subject = match params.user_id {
        Some(user_id) => {
            auth.ensure_can_access(&user_id)?;
            Some(user_id)
        }
        None if auth.is_admin() => None,
        None => Some(auth.user_id.clone()),
    };

    let report = state
        .analytics
        .get_analytics(params.start_date, params.end_date, subject.as_deref())
        .await?;
    Ok(Json(DataResponse { data: report }))
}
