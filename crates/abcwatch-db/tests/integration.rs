//! Offline unit tests for abcwatch-db pool configuration and row types.
//! These tests do not require a live database connection.

use abcwatch_core::{AppConfig, Environment, Snapshot};
use abcwatch_db::{NotificationRow, PoolConfig, SnapshotRow};
use chrono::Utc;
use sqlx::types::Json;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        bot_token: "123456:token".to_string(),
        telegram_api_base: "https://api.telegram.org".to_string(),
        search_url: "https://example.com/search-results".to_string(),
        store_locator_url: "https://example.com/stores".to_string(),
        check_interval_minutes: 30,
        inter_keyword_delay_ms: 2000,
        request_timeout_secs: 30,
        user_agent: "ua".to_string(),
        max_results: 10,
        city_cache_ttl_secs: 86_400,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn pool_config_default_is_conservative() {
    let pool_config = PoolConfig::default();
    assert_eq!(pool_config.max_connections, 10);
    assert_eq!(pool_config.min_connections, 1);
    assert_eq!(pool_config.acquire_timeout_secs, 10);
}

/// Compile-time smoke test: confirm that [`SnapshotRow`] has all expected
/// fields with the correct types, and that the domain conversion carries the
/// location list through. No database required.
#[test]
fn snapshot_row_converts_to_domain_snapshot() {
    let row = SnapshotRow {
        id: 1,
        subscriber_id: 555,
        keyword: "eagle rare".to_string(),
        product_name: "Eagle Rare 10yr".to_string(),
        product_code: "00043".to_string(),
        price: "$39.95".to_string(),
        availability: "In Stock".to_string(),
        total_stock: 17,
        store_locations: Json(vec!["A St - 17 in stock".to_string()]),
        captured_at: Utc::now(),
    };

    let snapshot = Snapshot::from(row);
    assert_eq!(snapshot.price, "$39.95");
    assert_eq!(snapshot.availability, "In Stock");
    assert_eq!(snapshot.total_stock, 17);
    assert_eq!(snapshot.store_locations, vec!["A St - 17 in stock".to_string()]);
}

#[test]
fn notification_row_has_expected_fields() {
    let row = NotificationRow {
        id: 9,
        subscriber_id: 555,
        keyword: "eagle rare".to_string(),
        product_name: "Eagle Rare 10yr".to_string(),
        product_code: None,
        sent_at: Utc::now(),
    };

    assert_eq!(row.subscriber_id, 555);
    assert!(row.product_code.is_none());
}
