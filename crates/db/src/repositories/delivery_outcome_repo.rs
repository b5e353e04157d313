//! Repository for the `delivery_outcomes` table.

use sqlx::PgPool;
use voyage_core::filter::DateRange;
use voyage_core::types::NotificationId;

use crate::models::delivery::{DeliveryOutcomeRow, NewDeliveryOutcome};

/// Column list for `delivery_outcomes` queries.
const COLUMNS: &str = "id, notification_id, user_id, notification_type, channel, delivered, \
    device_count, error, recorded_at";

/// Append-only access to channel delivery outcomes.
pub struct DeliveryOutcomeRepo;

impl DeliveryOutcomeRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewDeliveryOutcome,
    ) -> Result<DeliveryOutcomeRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO delivery_outcomes \
                (notification_id, user_id, notification_type, channel, delivered, device_count, error) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryOutcomeRow>(&query)
            .bind(input.notification_id)
            .bind(&input.user_id)
            .bind(input.notification_type.as_str())
            .bind(input.channel.as_str())
            .bind(input.delivered)
            .bind(input.device_count)
            .bind(&input.error)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_notification(
        pool: &PgPool,
        notification_id: NotificationId,
    ) -> Result<Vec<DeliveryOutcomeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM delivery_outcomes \
             WHERE notification_id = $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, DeliveryOutcomeRow>(&query)
            .bind(notification_id)
            .fetch_all(pool)
            .await
    }

    /// `(attempts, delivered)` for outcomes recorded within `range`,
    /// optionally for one user.
    pub async fn totals(
        pool: &PgPool,
        range: DateRange,
        user_id: Option<&str>,
    ) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE delivered) \
             FROM delivery_outcomes \
             WHERE recorded_at >= $1 AND recorded_at < $2 \
               AND ($3::text IS NULL OR user_id = $3)",
        )
        .bind(range.from_instant())
        .bind(range.until_instant())
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
