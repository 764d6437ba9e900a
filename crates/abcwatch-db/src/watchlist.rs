//! Database operations for `subscribers` and `watchlist`.
//!
//! Keywords are case-normalized (lower-cased, trimmed) on the way in, and
//! removal is a soft delete via the `is_active` flag so delivery history
//! stays attributable.

use sqlx::PgPool;

use crate::DbError;

/// Adds or refreshes a subscriber row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_subscriber(
    pool: &PgPool,
    subscriber_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO subscribers (subscriber_id, username, first_name, last_name) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (subscriber_id) DO UPDATE SET \
             username   = EXCLUDED.username, \
             first_name = EXCLUDED.first_name, \
             last_name  = EXCLUDED.last_name, \
             is_active  = TRUE",
    )
    .bind(subscriber_id)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .execute(pool)
    .await?;

    Ok(())
}

/// Adds a keyword to a subscriber's watchlist.
///
/// Returns `false` when the (normalized) keyword is already active for the
/// subscriber.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn add_keyword(pool: &PgPool, subscriber_id: i64, keyword: &str) -> Result<bool, DbError> {
    let keyword = normalize_keyword(keyword);

    let rows_affected = sqlx::query(
        "INSERT INTO watchlist (subscriber_id, keyword) \
         SELECT $1, $2 \
         WHERE NOT EXISTS ( \
             SELECT 1 FROM watchlist \
             WHERE subscriber_id = $1 AND keyword = $2 AND is_active \
         )",
    )
    .bind(subscriber_id)
    .bind(&keyword)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}

/// Deactivates a keyword on a subscriber's watchlist.
///
/// Returns `false` when the keyword was not active.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn remove_keyword(
    pool: &PgPool,
    subscriber_id: i64,
    keyword: &str,
) -> Result<bool, DbError> {
    let keyword = normalize_keyword(keyword);

    let rows_affected = sqlx::query(
        "UPDATE watchlist SET is_active = FALSE \
         WHERE subscriber_id = $1 AND keyword = $2 AND is_active",
    )
    .bind(subscriber_id)
    .bind(&keyword)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}

/// Deactivates every keyword for a subscriber. Returns how many were cleared.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn clear_watchlist(pool: &PgPool, subscriber_id: i64) -> Result<u64, DbError> {
    let rows_affected =
        sqlx::query("UPDATE watchlist SET is_active = FALSE WHERE subscriber_id = $1 AND is_active")
            .bind(subscriber_id)
            .execute(pool)
            .await?
            .rows_affected();

    Ok(rows_affected)
}

/// Active keywords for one subscriber, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn subscriber_keywords(
    pool: &PgPool,
    subscriber_id: i64,
) -> Result<Vec<String>, DbError> {
    let keywords = sqlx::query_scalar::<_, String>(
        "SELECT keyword FROM watchlist \
         WHERE subscriber_id = $1 AND is_active \
         ORDER BY created_at",
    )
    .bind(subscriber_id)
    .fetch_all(pool)
    .await?;

    Ok(keywords)
}

/// The full active watchlist across all subscribers, as (subscriber, keyword)
/// pairs. Ordered for stable cycle processing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn all_watchlist_pairs(pool: &PgPool) -> Result<Vec<(i64, String)>, DbError> {
    let pairs = sqlx::query_as::<_, (i64, String)>(
        "SELECT DISTINCT subscriber_id, keyword FROM watchlist \
         WHERE is_active \
         ORDER BY keyword, subscriber_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(pairs)
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}
