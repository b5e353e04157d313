//! Handlers for notification settings and email preferences.

use axum::extract::State;
use axum::Json;
use voyage_core::preferences::{
    EmailPreferences, EmailPreferencesUpdate, NotificationSettings, SettingsUpdate,
};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/settings
///
/// Stored settings, or the system defaults when none were saved.
pub async fn get_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<NotificationSettings>>> {
    let settings = state.preferences.get_settings(&auth.user_id).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/notifications/settings
///
/// Partial update; omitted fields and categories keep their values.
pub async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SettingsUpdate>,
) -> AppResult<Json<DataResponse<NotificationSettings>>> {
    let settings = state
        .preferences
        .update_settings(&auth.user_id, &input)
        .await?;
    Ok(Json(DataResponse { data: settings }))
}

/// POST /api/v1/notifications/settings/reset
pub async fn reset_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<NotificationSettings>>> {
    let settings = state.preferences.reset_settings(&auth.user_id).await?;
    Ok(Json(DataResponse { data: settings }))
}

// ---------------------------------------------------------------------------
// Email preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/email-preferences
pub async fn get_email_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<EmailPreferences>>> {
    let prefs = state.email.get_preferences(&auth.user_id).await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/email-preferences
pub async fn update_email_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<EmailPreferencesUpdate>,
) -> AppResult<Json<DataResponse<EmailPreferences>>> {
    let prefs = state
        .email
        .update_preferences(&auth.user_id, &input)
        .await?;
    Ok(Json(DataResponse { data: prefs }))
}
