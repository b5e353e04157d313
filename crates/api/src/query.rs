//! Query parameter types for API handlers.

use chrono::NaiveDate;
use serde::Deserialize;
use voyage_core::error::CoreError;
use voyage_core::filter::{parse_type_list, NotificationFilter};

/// Query parameters for `GET /notifications`.
///
/// `type` is a comma-separated category list (`?type=message,review`).
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "type")]
    pub types: Option<String>,
    pub read: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListParams {
    pub fn into_filter(self) -> Result<NotificationFilter, CoreError> {
        let types = match self.types.as_deref() {
            Some(raw) => parse_type_list(raw)?,
            None => Vec::new(),
        };
        let filter = NotificationFilter {
            types,
            read: self.read,
            start_date: self.start_date,
            end_date: self.end_date,
            limit: self.limit,
            offset: self.offset,
        };
        filter.validate()?;
        Ok(filter)
    }
}

/// Query parameters for `GET /notifications/analytics`.
#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Omitted: the caller's own report, or platform-wide for admins.
    pub user_id: Option<String>,
}

/// Query parameters for `POST /notifications/dispatch`.
#[derive(Debug, Default, Deserialize)]
pub struct DispatchParams {
    /// Publish on the in-process event bus instead of dispatching inline.
    #[serde(default)]
    pub queue: bool,
}
