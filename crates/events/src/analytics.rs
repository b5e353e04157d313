//! On-demand analytics reports.
//!
//! The stores aggregate per-day counts and delivery totals for a range;
//! [`voyage_core::analytics::build_report`] turns them into the report.

use std::sync::Arc;

use chrono::NaiveDate;
use voyage_core::analytics::{build_report, AnalyticsReport};
use voyage_core::filter::DateRange;
use voyage_db::{DeliveryLogStore, DeviceTokenStore, NotificationStore, StoreResult};

/// Computes [`AnalyticsReport`]s from the stores.
#[derive(Clone)]
pub struct AnalyticsAggregator {
    notifications: Arc<dyn NotificationStore>,
    deliveries: Arc<dyn DeliveryLogStore>,
    devices: Arc<dyn DeviceTokenStore>,
}

impl AnalyticsAggregator {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        deliveries: Arc<dyn DeliveryLogStore>,
        devices: Arc<dyn DeviceTokenStore>,
    ) -> Self {
        Self {
            notifications,
            deliveries,
            devices,
        }
    }

    /// Report for `start..=end`, for one user or platform-wide.
    ///
    /// An inverted range or one longer than the maximum is a validation
    /// error.
    pub async fn get_analytics(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        user_id: Option<&str>,
    ) -> StoreResult<AnalyticsReport> {
        let range = DateRange::new(start, end)?;

        let (counts, deliveries, platforms) = tokio::try_join!(
            self.notifications.daily_counts(range, user_id),
            self.deliveries.totals(range, user_id),
            self.devices.list_platforms(user_id),
        )?;

        tracing::debug!(
            user_id = user_id.unwrap_or("*"),
            %start,
            %end,
            groups = counts.len(),
            attempts = deliveries.attempts,
            "Computing analytics"
        );
        Ok(build_report(range, &counts, deliveries, &platforms))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use voyage_core::channels::Channel;
    use voyage_core::error::CoreError;
    use voyage_core::notification::{FreeFormData, NotificationData, NotificationType, Platform};
    use voyage_db::memory::MemoryStore;
    use voyage_db::models::delivery::NewDeliveryOutcome;
    use voyage_db::models::notification::NewNotification;
    use voyage_db::StoreError;

    use super::*;

    fn aggregator(store: &Arc<MemoryStore>) -> AnalyticsAggregator {
        AnalyticsAggregator::new(store.clone(), store.clone(), store.clone())
    }

    fn system(user: &str) -> NewNotification {
        NewNotification {
            user_id: user.into(),
            notification_type: NotificationType::System,
            title: "Welcome".into(),
            message: String::new(),
            data: NotificationData::System(FreeFormData::default()),
            in_app_visible: true,
        }
    }

    #[tokio::test]
    async fn report_scopes_to_user_and_today() {
        let store = Arc::new(MemoryStore::new());
        let a = store.create(system("u-1")).await.unwrap();
        store.create(system("u-1")).await.unwrap();
        store.create(system("u-2")).await.unwrap();
        store.mark_clicked(a.id).await.unwrap();
        store.register("u-1", "t1", Platform::Ios).await.unwrap();
        store.register("u-2", "t2", Platform::Web).await.unwrap();
        for delivered in [true, false] {
            store
                .record(NewDeliveryOutcome {
                    notification_id: a.id,
                    user_id: "u-1".into(),
                    notification_type: NotificationType::System,
                    channel: Channel::Push,
                    delivered,
                    device_count: 1,
                    error: None,
                })
                .await
                .unwrap();
        }

        let today = Utc::now().date_naive();
        let report = aggregator(&store)
            .get_analytics(today, today, Some("u-1"))
            .await
            .unwrap();

        assert_eq!(report.metrics.total_sent, 2);
        assert_eq!(report.metrics.total_read, 1);
        assert_eq!(report.metrics.total_clicked, 1);
        assert_eq!(report.metrics.read_rate, 50.0);
        assert_eq!(report.metrics.delivery_rate, 50.0);
        assert_eq!(report.trends.len(), 1);
        assert_eq!(report.devices.len(), 1);
        assert_eq!(report.devices[0].platform, Platform::Ios);
        assert_eq!(report.top_performing, Some(NotificationType::System));

        let global = aggregator(&store).get_analytics(today, today, None).await.unwrap();
        assert_eq!(global.metrics.total_sent, 3);
        assert_eq!(global.devices.len(), 2);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();
        assert_matches!(
            aggregator(&store).get_analytics(today, yesterday, None).await,
            Err(StoreError::Core(CoreError::Validation(_)))
        );
    }
}
