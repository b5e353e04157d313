//! Delivery analytics computation.
//!
//! Reports are derived views recomputed per query from per-day counts,
//! delivery totals, and registered devices. Nothing here is persisted; the
//! stores do the counting so only aggregates cross the boundary.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::filter::DateRange;
use crate::notification::{NotificationType, Platform};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Counts for one category on one UTC day, as aggregated by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTypeCounts {
    pub date: NaiveDate,
    pub notification_type: NotificationType,
    pub sent: u64,
    pub read: u64,
    pub clicked: u64,
}

/// Channel attempts logged within a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryTotals {
    pub attempts: u64,
    pub delivered: u64,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Per-category slice of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TypeBreakdown {
    pub sent: u64,
    pub read: u64,
    pub clicked: u64,
    pub read_rate: f64,
    pub click_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsMetrics {
    pub total_sent: u64,
    pub total_read: u64,
    pub total_clicked: u64,
    pub read_rate: f64,
    pub delivery_rate: f64,
    pub click_rate: f64,
    pub breakdown: BTreeMap<NotificationType, TypeBreakdown>,
}

/// Counts for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationTrend {
    pub date: NaiveDate,
    pub sent: u64,
    pub read: u64,
    pub clicked: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceStats {
    pub platform: Platform,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metrics: AnalyticsMetrics,
    pub trends: Vec<NotificationTrend>,
    pub devices: Vec<DeviceStats>,
    pub top_performing: Option<NotificationType>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// `part / whole * 100`, or `0.0` when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Build the full report for `range`.
///
/// Counts dated outside the range are ignored. Every category appears in the
/// breakdown, including those with nothing sent.
pub fn build_report(
    range: DateRange,
    counts: &[DailyTypeCounts],
    deliveries: DeliveryTotals,
    devices: &[Platform],
) -> AnalyticsReport {
    let in_range: Vec<&DailyTypeCounts> = counts
        .iter()
        .filter(|c| c.date >= range.start() && c.date <= range.end())
        .collect();

    let breakdown = build_breakdown(&in_range);
    let total_sent: u64 = breakdown.values().map(|b| b.sent).sum();
    let total_read: u64 = breakdown.values().map(|b| b.read).sum();
    let total_clicked: u64 = breakdown.values().map(|b| b.clicked).sum();

    let metrics = AnalyticsMetrics {
        total_sent,
        total_read,
        total_clicked,
        read_rate: percentage(total_read, total_sent),
        delivery_rate: percentage(deliveries.delivered, deliveries.attempts),
        click_rate: percentage(total_clicked, total_sent),
        breakdown,
    };

    AnalyticsReport {
        start_date: range.start(),
        end_date: range.end(),
        top_performing: top_performing(&metrics.breakdown),
        trends: build_trends(range, &in_range),
        devices: device_stats(devices),
        metrics,
    }
}

fn build_breakdown(counts: &[&DailyTypeCounts]) -> BTreeMap<NotificationType, TypeBreakdown> {
    let mut breakdown: BTreeMap<NotificationType, TypeBreakdown> = NotificationType::ALL
        .into_iter()
        .map(|ty| (ty, TypeBreakdown::default()))
        .collect();

    for c in counts {
        let entry = breakdown.entry(c.notification_type).or_default();
        entry.sent += c.sent;
        entry.read += c.read;
        entry.clicked += c.clicked;
    }

    for entry in breakdown.values_mut() {
        entry.read_rate = percentage(entry.read, entry.sent);
        entry.click_rate = percentage(entry.clicked, entry.sent);
    }
    breakdown
}

/// One entry per day in the range, chronologically, zero-filled.
fn build_trends(range: DateRange, counts: &[&DailyTypeCounts]) -> Vec<NotificationTrend> {
    let mut by_day: BTreeMap<NaiveDate, NotificationTrend> = range
        .days()
        .map(|date| {
            (
                date,
                NotificationTrend {
                    date,
                    sent: 0,
                    read: 0,
                    clicked: 0,
                },
            )
        })
        .collect();

    for c in counts {
        if let Some(day) = by_day.get_mut(&c.date) {
            day.sent += c.sent;
            day.read += c.read;
            day.clicked += c.clicked;
        }
    }
    by_day.into_values().collect()
}

/// Platform distribution over the given devices. Platforms without a device
/// are omitted; percentages sum to 100 whenever any device exists.
pub fn device_stats(devices: &[Platform]) -> Vec<DeviceStats> {
    let total = devices.len() as u64;
    Platform::ALL
        .into_iter()
        .filter_map(|platform| {
            let count = devices.iter().filter(|p| **p == platform).count() as u64;
            (count > 0).then(|| DeviceStats {
                platform,
                count,
                percentage: percentage(count, total),
            })
        })
        .collect()
}

/// Category with the best read rate among those with `sent > 0`.
///
/// Ties go to the higher click rate, then to declaration order.
pub fn top_performing(
    breakdown: &BTreeMap<NotificationType, TypeBreakdown>,
) -> Option<NotificationType> {
    let mut best: Option<(NotificationType, &TypeBreakdown)> = None;
    // BTreeMap iterates in declaration order, so a strict `>` keeps the
    // earlier category on a full tie.
    for (ty, entry) in breakdown.iter().filter(|(_, e)| e.sent > 0) {
        let better = match best {
            None => true,
            Some((_, current)) => {
                entry.read_rate > current.read_rate
                    || (entry.read_rate == current.read_rate
                        && entry.click_rate > current.click_rate)
            }
        };
        if better {
            best = Some((*ty, entry));
        }
    }
    best.map(|(ty, _)| ty)
}
