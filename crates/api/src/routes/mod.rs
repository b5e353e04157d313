pub mod health;
pub mod notification;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /notifications                      list, counts, read/click/delete
/// /notifications/settings             per-user channel settings
/// /notifications/email-preferences    email opt-ins and address
/// /notifications/devices              push device registration
/// /notifications/analytics            delivery analytics
/// /notifications/dispatch             service intake (service/admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/notifications", notification::router())
}
