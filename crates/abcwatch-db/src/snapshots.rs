//! Database operations for `item_snapshots` — the last observed state per
//! (subscriber, keyword, product identity).

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use abcwatch_core::{locations, InventoryRecord, Snapshot};

use crate::DbError;

/// A row from the `item_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub subscriber_id: i64,
    pub keyword: String,
    pub product_name: String,
    /// Empty string when the listing carried no code; part of the identity key.
    pub product_code: String,
    pub price: String,
    pub availability: String,
    pub total_stock: i64,
    pub store_locations: Json<Vec<String>>,
    pub captured_at: DateTime<Utc>,
}

impl From<SnapshotRow> for Snapshot {
    fn from(row: SnapshotRow) -> Self {
        Snapshot {
            price: row.price,
            availability: row.availability,
            total_stock: row.total_stock,
            store_locations: row.store_locations.0,
            captured_at: row.captured_at,
        }
    }
}

/// Returns the previous snapshot for a product identity, if one exists.
///
/// The identity tuple is `(subscriber_id, keyword, product_name,
/// product_code-or-empty)`; a record that gains a code after having had none
/// therefore misses here and is treated as a new item.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_snapshot(
    pool: &PgPool,
    subscriber_id: i64,
    keyword: &str,
    product_name: &str,
    product_code: &str,
) -> Result<Option<Snapshot>, DbError> {
    let row = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, subscriber_id, keyword, product_name, product_code, price, \
                availability, total_stock, store_locations, captured_at \
         FROM item_snapshots \
         WHERE subscriber_id = $1 AND keyword = $2 \
           AND product_name = $3 AND product_code = $4",
    )
    .bind(subscriber_id)
    .bind(keyword)
    .bind(product_name)
    .bind(product_code)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Snapshot::from))
}

/// Upserts the snapshot for `record`'s identity with its current state.
///
/// Called after every diff decision regardless of whether a notification
/// fired; the unconditional overwrite is what keeps the edge-triggered diff
/// rules one-shot.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_snapshot(
    pool: &PgPool,
    subscriber_id: i64,
    keyword: &str,
    record: &InventoryRecord,
) -> Result<(), DbError> {
    let total_stock = locations::total_stock(&record.locations);

    sqlx::query(
        "INSERT INTO item_snapshots \
             (subscriber_id, keyword, product_name, product_code, price, \
              availability, total_stock, store_locations) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (subscriber_id, keyword, product_name, product_code) DO UPDATE SET \
             price           = EXCLUDED.price, \
             availability    = EXCLUDED.availability, \
             total_stock     = EXCLUDED.total_stock, \
             store_locations = EXCLUDED.store_locations, \
             captured_at     = NOW()",
    )
    .bind(subscriber_id)
    .bind(keyword)
    .bind(&record.name)
    .bind(record.code_or_empty())
    .bind(&record.price)
    .bind(&record.availability)
    .bind(total_stock)
    .bind(Json(&record.locations))
    .execute(pool)
    .await?;

    Ok(())
}
