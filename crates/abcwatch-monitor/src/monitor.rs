//! The polling scheduler.
//!
//! One logical thread of control: sleep, run a cycle, repeat. Within a cycle
//! each distinct keyword is fetched exactly once no matter how many
//! subscribers watch it, keywords are processed strictly sequentially with a
//! politeness delay between them, and every per-keyword and per-subscriber
//! failure is contained to that unit. The shutdown signal is observed at the
//! inter-cycle sleep, between keywords, and inside the politeness delay, so
//! shutdown latency is bounded by one keyword's processing time.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::watch;

use abcwatch_core::{decide, InventoryRecord};
use abcwatch_scraper::{CityCache, ScraperError};

use crate::channel::DeliveryChannel;
use crate::format::{escape_markdown, render_notification};
use crate::source::InventorySource;
use crate::store::WatchStore;
use crate::templates::MessageTemplates;

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub check_interval: Duration,
    pub inter_keyword_delay: Duration,
}

pub struct Monitor<S, I, C> {
    store: S,
    source: I,
    channel: C,
    cities: CityCache,
    templates: MessageTemplates,
    config: MonitorConfig,
}

impl<S: WatchStore, I: InventorySource, C: DeliveryChannel> Monitor<S, I, C> {
    pub fn new(
        store: S,
        source: I,
        channel: C,
        cities: CityCache,
        templates: MessageTemplates,
        config: MonitorConfig,
    ) -> Self {
        Self {
            store,
            source,
            channel,
            cities,
            templates,
            config,
        }
    }

    /// Run cycles until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.config.check_interval.as_secs(),
            "starting inventory monitoring"
        );

        loop {
            self.run_cycle(&mut shutdown).await;
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.check_interval) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }

        tracing::info!("inventory monitoring stopped");
    }

    /// One full pass over the watchlist.
    async fn run_cycle(&self, shutdown: &mut watch::Receiver<bool>) {
        tracing::info!("starting watchlist check");

        let pairs = match self.store.all_watchlist_pairs().await {
            Ok(pairs) => pairs,
            Err(error) => {
                tracing::error!(%error, "failed to load watchlist; skipping cycle");
                return;
            }
        };
        if pairs.is_empty() {
            tracing::info!("no watchlist entries to check");
            return;
        }

        // Group subscribers by keyword so each keyword is fetched once per
        // cycle regardless of how many subscribers watch it.
        let mut by_keyword: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        for (subscriber_id, keyword) in pairs {
            by_keyword.entry(keyword).or_default().push(subscriber_id);
        }

        tracing::info!(keywords = by_keyword.len(), "checking watchlist keywords");

        let mut first = true;
        for (keyword, subscribers) in &by_keyword {
            if *shutdown.borrow() {
                tracing::info!("shutdown requested; abandoning cycle");
                return;
            }
            if !first {
                tokio::select! {
                    () = tokio::time::sleep(self.config.inter_keyword_delay) => {}
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            tracing::info!("shutdown requested during politeness delay");
                            return;
                        }
                    }
                }
            }
            first = false;

            self.check_keyword(keyword, subscribers).await;
        }

        tracing::info!("completed watchlist check");
    }

    /// Fetch one keyword and run diff + dispatch for each of its subscribers.
    async fn check_keyword(&self, keyword: &str, subscribers: &[i64]) {
        let records = match self.source.search(keyword).await {
            Ok(records) => records,
            Err(error @ ScraperError::UnrecognizedPage { .. }) => {
                tracing::warn!(keyword, %error, "search page shape changed; treating as no data");
                return;
            }
            Err(error) => {
                tracing::warn!(keyword, %error, "inventory fetch failed; skipping keyword this cycle");
                return;
            }
        };
        if records.is_empty() {
            tracing::debug!(keyword, "no inventory records for keyword");
            return;
        }

        let cities = self.cities.cities().await;
        for &subscriber_id in subscribers {
            if let Err(error) = self
                .notify_subscriber(subscriber_id, keyword, &records, &cities)
                .await
            {
                tracing::error!(subscriber_id, keyword, %error, "subscriber processing failed; continuing");
            }
        }
    }

    /// Diff every record against its snapshot, persist the new state, and
    /// send at most one message covering everything that changed.
    async fn notify_subscriber(
        &self,
        subscriber_id: i64,
        keyword: &str,
        records: &[InventoryRecord],
        cities: &[String],
    ) -> Result<(), abcwatch_db::DbError> {
        let mut changed: Vec<(&InventoryRecord, Vec<String>)> = Vec::new();

        for record in records {
            let previous = self
                .store
                .snapshot(subscriber_id, keyword, &record.name, record.code_or_empty())
                .await?;
            let decision = decide(previous.as_ref(), record);

            // Written whether or not we notify; the edge-triggered diff rules
            // rely on the snapshot always reflecting the latest poll.
            self.store.put_snapshot(subscriber_id, keyword, record).await?;

            if decision.notify {
                changed.push((record, decision.reasons));
            }
        }

        if changed.is_empty() {
            tracing::debug!(subscriber_id, keyword, "no notable changes");
            return Ok(());
        }

        tracing::info!(
            subscriber_id,
            keyword,
            items = changed.len(),
            "sending change notification"
        );

        let footer = self
            .templates
            .notification_footer(&escape_markdown(keyword));
        let message = render_notification(keyword, &changed, cities, &footer);

        if let Err(error) = self.channel.send(subscriber_id, &message).await {
            // Delivery failure is isolated to this subscriber; no audit rows
            // are written for a message that never went out.
            tracing::error!(subscriber_id, keyword, %error, "notification delivery failed");
            return Ok(());
        }

        for (record, _) in &changed {
            if let Err(error) = self
                .store
                .record_notification(subscriber_id, keyword, &record.name, record.code.as_deref())
                .await
            {
                tracing::warn!(
                    subscriber_id,
                    keyword,
                    product = %record.name,
                    %error,
                    "failed to record notification audit row"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use abcwatch_core::Snapshot;
    use abcwatch_db::DbError;

    use super::*;
    use crate::channel::DeliveryError;

    type SnapshotKey = (i64, String, String, String);

    #[derive(Default)]
    struct StoreState {
        pairs: Vec<(i64, String)>,
        snapshots: Mutex<HashMap<SnapshotKey, Snapshot>>,
        notifications: Mutex<Vec<(i64, String, String)>>,
        fail_reads: AtomicBool,
    }

    #[derive(Clone, Default)]
    struct MockStore {
        state: Arc<StoreState>,
    }

    impl MockStore {
        fn with_pairs(pairs: &[(i64, &str)]) -> Self {
            let state = StoreState {
                pairs: pairs
                    .iter()
                    .map(|(id, kw)| (*id, (*kw).to_string()))
                    .collect(),
                ..StoreState::default()
            };
            Self {
                state: Arc::new(state),
            }
        }

        fn seed_snapshot(&self, subscriber_id: i64, keyword: &str, record: &InventoryRecord) {
            let key = (
                subscriber_id,
                keyword.to_string(),
                record.name.clone(),
                record.code_or_empty().to_string(),
            );
            self.state
                .snapshots
                .lock()
                .unwrap()
                .insert(key, Snapshot::of(record, Utc::now()));
        }

        fn snapshot_count(&self) -> usize {
            self.state.snapshots.lock().unwrap().len()
        }

        fn notified(&self) -> Vec<(i64, String, String)> {
            self.state.notifications.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WatchStore for MockStore {
        async fn all_watchlist_pairs(&self) -> Result<Vec<(i64, String)>, DbError> {
            Ok(self.state.pairs.clone())
        }

        async fn snapshot(
            &self,
            subscriber_id: i64,
            keyword: &str,
            product_name: &str,
            product_code: &str,
        ) -> Result<Option<Snapshot>, DbError> {
            if self.state.fail_reads.load(Ordering::SeqCst) {
                return Err(DbError::NotFound);
            }
            let key = (
                subscriber_id,
                keyword.to_string(),
                product_name.to_string(),
                product_code.to_string(),
            );
            Ok(self.state.snapshots.lock().unwrap().get(&key).cloned())
        }

        async fn put_snapshot(
            &self,
            subscriber_id: i64,
            keyword: &str,
            record: &InventoryRecord,
        ) -> Result<(), DbError> {
            let key = (
                subscriber_id,
                keyword.to_string(),
                record.name.clone(),
                record.code_or_empty().to_string(),
            );
            self.state
                .snapshots
                .lock()
                .unwrap()
                .insert(key, Snapshot::of(record, Utc::now()));
            Ok(())
        }

        async fn record_notification(
            &self,
            subscriber_id: i64,
            keyword: &str,
            product_name: &str,
            _product_code: Option<&str>,
        ) -> Result<(), DbError> {
            self.state.notifications.lock().unwrap().push((
                subscriber_id,
                keyword.to_string(),
                product_name.to_string(),
            ));
            Ok(())
        }
    }

    #[derive(Default)]
    struct SourceState {
        responses: HashMap<String, Vec<InventoryRecord>>,
        failing: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    #[derive(Clone, Default)]
    struct MockSource {
        state: Arc<SourceState>,
    }

    impl MockSource {
        fn calls(&self) -> Vec<String> {
            self.state.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InventorySource for MockSource {
        async fn search(&self, keyword: &str) -> Result<Vec<InventoryRecord>, ScraperError> {
            self.state.calls.lock().unwrap().push(keyword.to_string());
            if self.state.failing.contains(keyword) {
                return Err(ScraperError::UnexpectedStatus {
                    status: 503,
                    url: "http://test/search-results".to_string(),
                });
            }
            Ok(self
                .state
                .responses
                .get(keyword)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct ChannelState {
        sent: Mutex<Vec<(i64, String)>>,
        fail_for: HashSet<i64>,
    }

    #[derive(Clone, Default)]
    struct MockChannel {
        state: Arc<ChannelState>,
    }

    impl MockChannel {
        fn sent(&self) -> Vec<(i64, String)> {
            self.state.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliveryChannel for MockChannel {
        async fn send(&self, recipient_id: i64, text: &str) -> Result<(), DeliveryError> {
            if self.state.fail_for.contains(&recipient_id) {
                return Err(DeliveryError::Rejected {
                    status: 403,
                    description: "blocked".to_string(),
                });
            }
            self.state
                .sent
                .lock()
                .unwrap()
                .push((recipient_id, text.to_string()));
            Ok(())
        }
    }

    fn in_stock_record(name: &str, code: Option<&str>) -> InventoryRecord {
        InventoryRecord {
            name: name.to_string(),
            code: code.map(str::to_string),
            size: "750ml".to_string(),
            price: "$39.95".to_string(),
            availability: "In Stock".to_string(),
            locations: vec!["2500 Atlantic Ave Raleigh, NC 27604 - 12 in stock".to_string()],
        }
    }

    fn out_of_stock_record(name: &str) -> InventoryRecord {
        InventoryRecord {
            name: name.to_string(),
            code: None,
            size: "750ml".to_string(),
            price: "$39.95".to_string(),
            availability: "Out of Stock".to_string(),
            locations: Vec::new(),
        }
    }

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            check_interval: Duration::from_secs(1800),
            inter_keyword_delay: Duration::ZERO,
        }
    }

    fn monitor(
        store: MockStore,
        source: MockSource,
        channel: MockChannel,
    ) -> Monitor<MockStore, MockSource, MockChannel> {
        Monitor::new(
            store,
            source,
            channel,
            CityCache::with_fixed(vec!["Raleigh".to_string()]),
            MessageTemplates::default(),
            test_config(),
        )
    }

    async fn run_one_cycle(monitor: &Monitor<MockStore, MockSource, MockChannel>) {
        let (_tx, mut rx) = watch::channel(false);
        monitor.run_cycle(&mut rx).await;
    }

    #[tokio::test]
    async fn failed_keyword_does_not_block_later_keywords() {
        let store = MockStore::with_pairs(&[(1, "alpha"), (1, "beta")]);
        let source = MockSource {
            state: Arc::new(SourceState {
                responses: HashMap::from([(
                    "beta".to_string(),
                    vec![in_stock_record("Beta Bourbon", Some("001"))],
                )]),
                failing: HashSet::from(["alpha".to_string()]),
                calls: Mutex::new(Vec::new()),
            }),
        };
        let channel = MockChannel::default();

        let monitor = monitor(store.clone(), source.clone(), channel.clone());
        run_one_cycle(&monitor).await;

        assert_eq!(source.calls(), vec!["alpha".to_string(), "beta".to_string()]);
        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 1);
        assert!(sent[0].1.contains("Beta Bourbon"));
    }

    #[tokio::test]
    async fn keyword_is_fetched_once_for_many_subscribers() {
        let store = MockStore::with_pairs(&[(1, "alpha"), (2, "alpha"), (3, "alpha")]);
        let source = MockSource {
            state: Arc::new(SourceState {
                responses: HashMap::from([(
                    "alpha".to_string(),
                    vec![in_stock_record("Alpha Rye", Some("002"))],
                )]),
                ..SourceState::default()
            }),
        };
        let channel = MockChannel::default();

        let monitor = monitor(store.clone(), source.clone(), channel.clone());
        run_one_cycle(&monitor).await;

        assert_eq!(source.calls(), vec!["alpha".to_string()]);
        let recipients: Vec<i64> = channel.sent().iter().map(|(id, _)| *id).collect();
        assert_eq!(recipients, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn snapshot_is_written_even_when_nothing_notifies() {
        let store = MockStore::with_pairs(&[(1, "alpha")]);
        let source = MockSource {
            state: Arc::new(SourceState {
                responses: HashMap::from([(
                    "alpha".to_string(),
                    vec![out_of_stock_record("Sold Out Stout")],
                )]),
                ..SourceState::default()
            }),
        };
        let channel = MockChannel::default();

        let monitor = monitor(store.clone(), source.clone(), channel.clone());
        run_one_cycle(&monitor).await;

        assert!(channel.sent().is_empty());
        assert_eq!(store.snapshot_count(), 1);
    }

    #[tokio::test]
    async fn second_identical_cycle_sends_nothing() {
        let store = MockStore::with_pairs(&[(1, "alpha")]);
        let source = MockSource {
            state: Arc::new(SourceState {
                responses: HashMap::from([(
                    "alpha".to_string(),
                    vec![in_stock_record("Alpha Rye", Some("002"))],
                )]),
                ..SourceState::default()
            }),
        };
        let channel = MockChannel::default();

        let monitor = monitor(store.clone(), source.clone(), channel.clone());
        run_one_cycle(&monitor).await;
        assert_eq!(channel.sent().len(), 1);

        run_one_cycle(&monitor).await;
        assert_eq!(channel.sent().len(), 1, "identical state must not renotify");
    }

    #[tokio::test]
    async fn delivery_failure_for_one_subscriber_spares_the_rest() {
        let store = MockStore::with_pairs(&[(1, "alpha"), (2, "alpha")]);
        let source = MockSource {
            state: Arc::new(SourceState {
                responses: HashMap::from([(
                    "alpha".to_string(),
                    vec![in_stock_record("Alpha Rye", Some("002"))],
                )]),
                ..SourceState::default()
            }),
        };
        let channel = MockChannel {
            state: Arc::new(ChannelState {
                fail_for: HashSet::from([1]),
                ..ChannelState::default()
            }),
        };

        let monitor = monitor(store.clone(), source.clone(), channel.clone());
        run_one_cycle(&monitor).await;

        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 2);

        // Audit rows only for the message that actually went out.
        let notified = store.notified();
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].0, 2);
    }

    #[tokio::test]
    async fn store_failure_is_contained_to_the_subscriber_unit() {
        let store = MockStore::with_pairs(&[(1, "alpha")]);
        store.state.fail_reads.store(true, Ordering::SeqCst);
        let source = MockSource {
            state: Arc::new(SourceState {
                responses: HashMap::from([(
                    "alpha".to_string(),
                    vec![in_stock_record("Alpha Rye", Some("002"))],
                )]),
                ..SourceState::default()
            }),
        };
        let channel = MockChannel::default();

        let monitor = monitor(store.clone(), source.clone(), channel.clone());
        run_one_cycle(&monitor).await;

        assert!(channel.sent().is_empty());
        assert_eq!(store.snapshot_count(), 0);
    }

    #[tokio::test]
    async fn code_appearing_later_creates_a_new_identity() {
        let store = MockStore::with_pairs(&[(1, "alpha")]);
        // Previously observed without a code…
        store.seed_snapshot(1, "alpha", &in_stock_record("Alpha Rye", None));

        // …and the page now carries a PLU for the same name.
        let source = MockSource {
            state: Arc::new(SourceState {
                responses: HashMap::from([(
                    "alpha".to_string(),
                    vec![in_stock_record("Alpha Rye", Some("002"))],
                )]),
                ..SourceState::default()
            }),
        };
        let channel = MockChannel::default();

        let monitor = monitor(store.clone(), source.clone(), channel.clone());
        run_one_cycle(&monitor).await;

        // The coded record misses the code-less snapshot, so it is treated as
        // a brand-new item.
        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Item is now available"));
        assert_eq!(store.snapshot_count(), 2, "old identity is left in place");
    }

    #[tokio::test]
    async fn shutdown_before_the_first_keyword_fetches_nothing() {
        let store = MockStore::with_pairs(&[(1, "alpha")]);
        let source = MockSource::default();
        let channel = MockChannel::default();

        let monitor = monitor(store, source.clone(), channel);
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        monitor.run_cycle(&mut rx).await;

        assert!(source.calls().is_empty());
    }
}
