//! Handlers for push device registration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use voyage_core::notification::Platform;
use voyage_db::models::device_token::DeviceToken;

use crate::error::AppResult;
use crate::handlers::notification::DeletedResponse;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for `POST /notifications/devices`.
#[derive(Debug, Deserialize)]
pub struct RegisterDevice {
    pub token: String,
    pub platform: Platform,
}

/// GET /api/v1/notifications/devices
pub async fn list_devices(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<DeviceToken>>>> {
    let devices = state.push.list_device_tokens(&auth.user_id).await?;
    Ok(Json(DataResponse { data: devices }))
}

/// POST /api/v1/notifications/devices
///
/// Upsert: registering a known token refreshes its `last_used_at`.
pub async fn register_device(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RegisterDevice>,
) -> AppResult<(StatusCode, Json<DataResponse<DeviceToken>>)> {
    let device = state
        .push
        .register_device_token(&auth.user_id, &input.token, input.platform)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: device })))
}

/// DELETE /api/v1/notifications/devices/{token}
pub async fn unregister_device(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<DeletedResponse>>> {
    let deleted = state
        .push
        .unregister_device_token(&auth.user_id, &token)
        .await?;
    Ok(Json(DataResponse {
        data: DeletedResponse { deleted },
    }))
}
