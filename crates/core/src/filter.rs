//! Notification list filtering and date-range handling.
//!
//! All supplied filter fields combine with AND; the type set is OR-combined.
//! Dates are UTC calendar days and both bounds are inclusive.

use chrono::{Days, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::error::CoreError;
use crate::notification::NotificationType;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest page an explicit `limit` may request.
pub const MAX_LIMIT: i64 = 100;

/// Longest range an analytics report may span, in days.
pub const MAX_ANALYTICS_RANGE_DAYS: i64 = 366;

// ---------------------------------------------------------------------------
// NotificationFilter
// ---------------------------------------------------------------------------

/// Filter for listing a user's notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationFilter {
    /// Categories to include. Empty means every category.
    #[serde(default)]
    pub types: Vec<NotificationType>,
    /// Restrict to read (`true`) or unread (`false`) records.
    pub read: Option<bool>,
    /// Inclusive lower bound on the creation day.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the creation day.
    pub end_date: Option<NaiveDate>,
    /// Page size. Absent means every matching record.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl NotificationFilter {
    /// Filter matching only unread records.
    pub fn unread() -> Self {
        Self {
            read: Some(false),
            ..Self::default()
        }
    }

    /// Reject malformed filters before they reach a store.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(CoreError::Validation(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        if matches!(self.limit, Some(l) if l < 1) {
            return Err(CoreError::Validation("limit must be at least 1".into()));
        }
        if matches!(self.offset, Some(o) if o < 0) {
            return Err(CoreError::Validation("offset must not be negative".into()));
        }
        Ok(())
    }

    /// Inclusive start instant derived from `start_date`.
    pub fn created_from(&self) -> Option<Timestamp> {
        self.start_date.map(start_of_day)
    }

    /// Exclusive end instant: midnight after `end_date`.
    pub fn created_before(&self) -> Option<Timestamp> {
        self.end_date.map(end_of_day_exclusive)
    }

    /// Whether a record with these attributes passes the filter.
    pub fn matches(&self, ty: NotificationType, is_read: bool, created_at: Timestamp) -> bool {
        if !self.types.is_empty() && !self.types.contains(&ty) {
            return false;
        }
        if matches!(self.read, Some(r) if r != is_read) {
            return false;
        }
        if matches!(self.created_from(), Some(from) if created_at < from) {
            return false;
        }
        if matches!(self.created_before(), Some(before) if created_at >= before) {
            return false;
        }
        true
    }

    /// Requested page size capped at [`MAX_LIMIT`]; `None` when unpaged.
    pub fn effective_limit(&self) -> Option<i64> {
        self.limit.map(|l| l.clamp(1, MAX_LIMIT))
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Parse a comma-separated category list such as `"message,review"`.
///
/// Blank segments are ignored, unknown names are a validation error.
pub fn parse_type_list(raw: &str) -> Result<Vec<NotificationType>, CoreError> {
    let mut types = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let ty = NotificationType::parse(part)?;
        if !types.contains(&ty) {
            types.push(ty);
        }
    }
    Ok(types)
}

// ---------------------------------------------------------------------------
// DateRange
// ---------------------------------------------------------------------------

/// Inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting inverted or over-long spans.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::Validation(format!(
                "start_date {start} is after end_date {end}"
            )));
        }
        let span = (end - start).num_days() + 1;
        if span > MAX_ANALYTICS_RANGE_DAYS {
            return Err(CoreError::Validation(format!(
                "date range spans {span} days, maximum is {MAX_ANALYTICS_RANGE_DAYS}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn from_instant(&self) -> Timestamp {
        start_of_day(self.start)
    }

    pub fn until_instant(&self) -> Timestamp {
        end_of_day_exclusive(self.end)
    }

    pub fn contains(&self, at: Timestamp) -> bool {
        at >= self.from_instant() && at < self.until_instant()
    }

    /// Every day in the range, in chronological order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take_while({
            let end = self.end;
            move |d| *d <= end
        })
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

fn start_of_day(day: NaiveDate) -> Timestamp {
    Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN))
}

fn end_of_day_exclusive(day: NaiveDate) -> Timestamp {
    let next = day.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    start_of_day(next)
}
