//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Records addressed by
//! id must belong to the caller unless the caller is an admin.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use voyage_core::badge::badge_label;
use voyage_core::error::CoreError;
use voyage_core::types::NotificationId;
use voyage_db::models::delivery::DeliveryOutcome;
use voyage_db::models::notification::NotificationRecord;
use voyage_events::{DispatchRequest, NotificationEvent};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireDispatcher;
use crate::query::{DispatchParams, ListParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
    /// Display label, `None` when the badge should be hidden.
    pub badge: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub marked_read: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
    /// Number of live bus subscribers that received the event.
    pub receivers: usize,
}

/// Load a record and check the caller may act on it.
async fn owned_record(
    state: &AppState,
    auth: &AuthUser,
    id: NotificationId,
) -> AppResult<NotificationRecord> {
    let record = state
        .stores
        .notifications
        .get(id)
        .await?
        .ok_or_else(|| CoreError::notification_not_found(id))?;
    auth.ensure_can_access(&record.user_id)?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// Listing and counts
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
///
/// List the caller's visible notifications, newest first.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<NotificationRecord>>>> {
    let filter = params.into_filter()?;
    let notifications = state
        .stores
        .notifications
        .list(&auth.user_id, &filter)
        .await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UnreadCountResponse>>> {
    let count = state.stores.notifications.unread_count(&auth.user_id).await?;
    Ok(Json(DataResponse {
        data: UnreadCountResponse {
            count,
            badge: badge_label(count),
        },
    }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/notifications/{id}/read
///
/// Idempotent: re-reading keeps the original `read_at`.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> AppResult<Json<DataResponse<NotificationRecord>>> {
    owned_record(&state, &auth, id).await?;
    let record = state.stores.notifications.mark_read(id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/notifications/{id}/click
pub async fn mark_clicked(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> AppResult<Json<DataResponse<NotificationRecord>>> {
    owned_record(&state, &auth, id).await?;
    let record = state.stores.notifications.mark_clicked(id).await?;
    tracing::debug!(notification_id = %id, user_id = %auth.user_id, "Notification clicked");
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MarkAllReadResponse>>> {
    let marked_read = state
        .stores
        .notifications
        .mark_all_read(&auth.user_id)
        .await?;
    Ok(Json(DataResponse {
        data: MarkAllReadResponse { marked_read },
    }))
}

/// DELETE /api/v1/notifications/{id}
///
/// Returns `deleted: false` for an unknown id.
pub async fn delete_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> AppResult<Json<DataResponse<DeletedResponse>>> {
    let deleted = match state.stores.notifications.get(id).await? {
        Some(record) => {
            auth.ensure_can_access(&record.user_id)?;
            state.stores.notifications.delete(id).await?
        }
        None => false,
    };
    Ok(Json(DataResponse {
        data: DeletedResponse { deleted },
    }))
}

/// GET /api/v1/notifications/{id}/deliveries
///
/// Push and email attempts logged for one record, oldest first.
pub async fn list_deliveries(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> AppResult<Json<DataResponse<Vec<DeliveryOutcome>>>> {
    owned_record(&state, &auth, id).await?;
    let outcomes = state.stores.deliveries.list_for_notification(id).await?;
    Ok(Json(DataResponse { data: outcomes }))
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// POST /api/v1/notifications/dispatch
///
/// Service-to-service intake. With `?queue=true` the request is published on
/// the event bus and answered with 202; otherwise it is dispatched inline and
/// the stored record is returned with 201.
pub async fn dispatch(
    RequireDispatcher(caller): RequireDispatcher,
    State(state): State<AppState>,
    Query(params): Query<DispatchParams>,
    Json(request): Json<DispatchRequest>,
) -> AppResult<impl IntoResponse> {
    if params.queue {
        let event = NotificationEvent::new(request).with_source(caller.user_id);
        let receivers = state.event_bus.publish(event);
        let body = DataResponse {
            data: QueuedResponse {
                queued: receivers > 0,
                receivers,
            },
        };
        return Ok((StatusCode::ACCEPTED, Json(body)).into_response());
    }

    let record = state.dispatcher.dispatch(request).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: record })).into_response())
}
