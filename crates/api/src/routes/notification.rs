//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{analytics, devices, notification, preferences};
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                          -> list_notifications
/// GET    /unread-count              -> unread_count
/// POST   /read-all                  -> mark_all_read
/// POST   /{id}/read                 -> mark_read
/// POST   /{id}/click                -> mark_clicked
/// GET    /{id}/deliveries           -> list_deliveries
/// DELETE /{id}                      -> delete_notification
/// POST   /dispatch                  -> dispatch
///
/// GET    /settings                  -> get_settings
/// PUT    /settings                  -> update_settings
/// POST   /settings/reset            -> reset_settings
/// GET    /email-preferences         -> get_email_preferences
/// PUT    /email-preferences         -> update_email_preferences
///
/// GET    /devices                   -> list_devices
/// POST   /devices                   -> register_device
/// DELETE /devices/{token}           -> unregister_device
///
/// GET    /analytics                 -> get_analytics
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // Core notification endpoints
        .route("/", get(notification::list_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/read-all", post(notification::mark_all_read))
        .route("/dispatch", post(notification::dispatch))
        .route("/{id}", delete(notification::delete_notification))
        .route("/{id}/read", post(notification::mark_read))
        .route("/{id}/click", post(notification::mark_clicked))
        .route("/{id}/deliveries", get(notification::list_deliveries))
        // Settings and email preferences
        .route(
            "/settings",
            get(preferences::get_settings).put(preferences::update_settings),
        )
        .route("/settings/reset", post(preferences::reset_settings))
        .route(
            "/email-preferences",
            get(preferences::get_email_preferences).put(preferences::update_email_preferences),
        )
        // Devices
        .route(
            "/devices",
            get(devices::list_devices).post(devices::register_device),
        )
        .route("/devices/{token}", delete(devices::unregister_device))
        // Analytics
        .route("/analytics", get(analytics::get_analytics))
}
