//! Cached reference-city lookup for the location classifier.
//!
//! City names come from the retailer's store-locator endpoint. The cache is
//! an explicit, injectable component (not process-wide state) with a visible
//! TTL and refresh entry point, so tests can seed a fixed list and drive
//! expiry deterministically.

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::ScraperError;

/// Fallback list used whenever the store-locator endpoint is unreachable.
pub const DEFAULT_CITIES: [&str; 12] = [
    "Raleigh",
    "Cary",
    "Apex",
    "Wake Forest",
    "Garner",
    "Holly Springs",
    "Morrisville",
    "Fuquay Varina",
    "Knightdale",
    "Wendell",
    "Zebulon",
    "Rolesville",
];

/// Locator payload values that are not city names.
const NON_CITY_VALUES: [&str; 3] = ["North Carolina", "NC", "United States"];

#[derive(Debug, Deserialize)]
struct StoreEntry {
    #[serde(default)]
    city: Option<String>,
}

struct CachedCities {
    cities: Vec<String>,
    fetched_at: Instant,
}

/// TTL-bounded cache over the store-locator city list.
pub struct CityCache {
    client: reqwest::Client,
    locator_url: String,
    ttl: Duration,
    state: Mutex<Option<CachedCities>>,
}

impl CityCache {
    #[must_use]
    pub fn new(client: reqwest::Client, locator_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            locator_url: locator_url.into(),
            ttl,
            state: Mutex::new(None),
        }
    }

    /// A cache pre-seeded with a fixed list that never expires. Test seam.
    #[must_use]
    pub fn with_fixed(cities: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            locator_url: String::new(),
            ttl: Duration::MAX,
            state: Mutex::new(Some(CachedCities {
                cities,
                fetched_at: Instant::now(),
            })),
        }
    }

    /// The current reference city list.
    ///
    /// Serves the cached list while it is inside the TTL; otherwise refreshes
    /// from the locator endpoint. Never fails: a refresh error is logged and
    /// the fixed default list is returned instead (without being cached, so
    /// the next call retries the endpoint).
    pub async fn cities(&self) -> Vec<String> {
        if let Some(cached) = self.cached() {
            return cached;
        }

        match self.refresh().await {
            Ok(cities) => cities,
            Err(error) => {
                tracing::warn!(%error, "store locator fetch failed; using default city list");
                DEFAULT_CITIES.iter().map(|s| (*s).to_string()).collect()
            }
        }
    }

    /// Fetch the locator payload and replace the cached list.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Http`] — transport failure or timeout.
    /// - [`ScraperError::UnexpectedStatus`] — non-2xx response.
    /// - [`ScraperError::Deserialize`] — payload is not the expected JSON
    ///   array of store objects.
    pub async fn refresh(&self) -> Result<Vec<String>, ScraperError> {
        let response = self.client.get(&self.locator_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.locator_url.clone(),
            });
        }

        let body = response.text().await?;
        let stores: Vec<StoreEntry> =
            serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
                context: format!("store locator payload from {}", self.locator_url),
                source: e,
            })?;

        // BTreeSet both dedupes and keeps the list in a stable sorted order.
        let cities: Vec<String> = stores
            .into_iter()
            .filter_map(|store| store.city)
            .map(|city| city.trim().to_string())
            .filter(|city| !city.is_empty() && !NON_CITY_VALUES.contains(&city.as_str()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        tracing::debug!(count = cities.len(), "refreshed reference city list");

        let mut state = self.state.lock().expect("city cache lock poisoned");
        *state = Some(CachedCities {
            cities: cities.clone(),
            fetched_at: Instant::now(),
        });
        Ok(cities)
    }

    fn cached(&self) -> Option<Vec<String>> {
        let state = self.state.lock().expect("city cache lock poisoned");
        state
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.cities.clone())
    }
}
