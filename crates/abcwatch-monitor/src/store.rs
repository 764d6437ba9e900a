//! Persistent-store boundary consumed by the scheduler.

use async_trait::async_trait;
use sqlx::PgPool;

use abcwatch_core::{InventoryRecord, Snapshot};
use abcwatch_db::DbError;

/// The snapshot store plus the watchlist/audit reads the scheduler needs.
///
/// A store error fails only the subscriber/keyword unit it occurred in —
/// the scheduler logs it and moves on.
#[async_trait]
pub trait WatchStore: Send + Sync {
    /// Every active (subscriber, keyword) pair.
    async fn all_watchlist_pairs(&self) -> Result<Vec<(i64, String)>, DbError>;

    /// Previous snapshot for a product identity, if any.
    async fn snapshot(
        &self,
        subscriber_id: i64,
        keyword: &str,
        product_name: &str,
        product_code: &str,
    ) -> Result<Option<Snapshot>, DbError>;

    /// Overwrite the snapshot for `record`'s identity with its current state.
    async fn put_snapshot(
        &self,
        subscriber_id: i64,
        keyword: &str,
        record: &InventoryRecord,
    ) -> Result<(), DbError>;

    /// Append one delivery audit row.
    async fn record_notification(
        &self,
        subscriber_id: i64,
        keyword: &str,
        product_name: &str,
        product_code: Option<&str>,
    ) -> Result<(), DbError>;
}

/// Production store backed by the Postgres pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatchStore for PgStore {
    async fn all_watchlist_pairs(&self) -> Result<Vec<(i64, String)>, DbError> {
        abcwatch_db::all_watchlist_pairs(&self.pool).await
    }

    async fn snapshot(
        &self,
        subscriber_id: i64,
        keyword: &str,
        product_name: &str,
        product_code: &str,
    ) -> Result<Option<Snapshot>, DbError> {
        abcwatch_db::get_snapshot(&self.pool, subscriber_id, keyword, product_name, product_code)
            .await
    }

    async fn put_snapshot(
        &self,
        subscriber_id: i64,
        keyword: &str,
        record: &InventoryRecord,
    ) -> Result<(), DbError> {
        abcwatch_db::upsert_snapshot(&self.pool, subscriber_id, keyword, record).await
    }

    async fn record_notification(
        &self,
        subscriber_id: i64,
        keyword: &str,
        product_name: &str,
        product_code: Option<&str>,
    ) -> Result<(), DbError> {
        abcwatch_db::add_notification_record(
            &self.pool,
            subscriber_id,
            keyword,
            product_name,
            product_code,
        )
        .await
    }
}
