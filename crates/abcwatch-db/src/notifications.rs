//! Append-only delivery audit rows.
//!
//! These exist for observability of what was sent and when; the notify
//! decision itself is snapshot-driven and never reads this table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `notifications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub subscriber_id: i64,
    pub keyword: String,
    pub product_name: String,
    pub product_code: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Records that a subscriber was notified about a product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn add_notification_record(
    pool: &PgPool,
    subscriber_id: i64,
    keyword: &str,
    product_name: &str,
    product_code: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO notifications (subscriber_id, keyword, product_name, product_code) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(subscriber_id)
    .bind(keyword)
    .bind(product_name)
    .bind(product_code)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether the subscriber was notified about this product within the window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn was_recently_notified(
    pool: &PgPool,
    subscriber_id: i64,
    keyword: &str,
    product_name: &str,
    within_hours: i32,
) -> Result<bool, DbError> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM notifications \
         WHERE subscriber_id = $1 AND keyword = $2 AND product_name = $3 \
           AND sent_at > NOW() - make_interval(hours => $4) \
         LIMIT 1",
    )
    .bind(subscriber_id)
    .bind(keyword)
    .bind(product_name)
    .bind(within_hours)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}
