//! Repository for the `notifications` table.

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use voyage_core::filter::{DateRange, NotificationFilter};
use voyage_core::types::{NotificationId, Timestamp};

use crate::models::notification::{DailyCountRow, NewNotification, NotificationRow};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, notification_type, title, message, data, is_read, \
    read_at, clicked_at, in_app_visible, created_at";

/// Provides CRUD operations for notification records.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification, returning the stored row.
    ///
    /// `clock_timestamp()` rather than `NOW()` so rows inserted in one
    /// transaction still get distinct creation times.
    pub async fn create(
        pool: &PgPool,
        input: &NewNotification,
    ) -> Result<NotificationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (id, user_id, notification_type, title, message, data, in_app_visible, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, clock_timestamp()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(Uuid::now_v7())
            .bind(&input.user_id)
            .bind(input.notification_type.as_str())
            .bind(&input.title)
            .bind(&input.message)
            .bind(Json(&input.data))
            .bind(input.in_app_visible)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: NotificationId,
    ) -> Result<Option<NotificationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List visible notifications for a user, newest first.
    ///
    /// Every filter field is bound; absent ones are neutralised in SQL so the
    /// statement text stays fixed. A NULL limit is `LIMIT ALL`.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let types: Vec<&str> = filter.types.iter().map(|t| t.as_str()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 AND in_app_visible = true \
               AND (cardinality($2::text[]) = 0 OR notification_type = ANY($2)) \
               AND ($3::boolean IS NULL OR is_read = $3) \
               AND ($4::timestamptz IS NULL OR created_at >= $4) \
               AND ($5::timestamptz IS NULL OR created_at < $5) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $6::bigint OFFSET $7"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .bind(&types)
            .bind(filter.read)
            .bind(filter.created_from())
            .bind(filter.created_before())
            .bind(filter.effective_limit())
            .bind(filter.effective_offset())
            .fetch_all(pool)
            .await
    }

    /// Get the number of visible unread notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications \
             WHERE user_id = $1 AND is_read = false AND in_app_visible = true",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Mark a notification read, keeping the first `read_at`.
    ///
    /// Returns `None` if no row has this id.
    pub async fn mark_read(
        pool: &PgPool,
        id: NotificationId,
    ) -> Result<Option<NotificationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record the first click, which also marks the notification read.
    pub async fn mark_clicked(
        pool: &PgPool,
        id: NotificationId,
    ) -> Result<Option<NotificationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET is_read = true, \
                 read_at = COALESCE(read_at, NOW()), \
                 clicked_at = COALESCE(clicked_at, NOW()) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark all visible unread notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE user_id = $1 AND is_read = false AND in_app_visible = true",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a notification. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: NotificationId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sent/read/clicked counts per UTC day and type for notifications
    /// created within `range`, optionally for one user.
    pub async fn daily_counts(
        pool: &PgPool,
        range: DateRange,
        user_id: Option<&str>,
    ) -> Result<Vec<DailyCountRow>, sqlx::Error> {
        sqlx::query_as::<_, DailyCountRow>(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, \
                    notification_type, \
                    COUNT(*) AS sent, \
                    COUNT(*) FILTER (WHERE is_read) AS read_count, \
                    COUNT(clicked_at) AS clicked_count \
             FROM notifications \
             WHERE created_at >= $1 AND created_at < $2 \
               AND ($3::text IS NULL OR user_id = $3) \
             GROUP BY day, notification_type \
             ORDER BY day, notification_type",
        )
        .bind(range.from_instant())
        .bind(range.until_instant())
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Delete notifications created before `cutoff`.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
