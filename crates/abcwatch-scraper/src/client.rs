//! HTTP client for the retailer's inventory search endpoint.

use std::time::Duration;

use abcwatch_core::inventory::InventoryRecord;

use crate::error::ScraperError;
use crate::parse::{parse_search_page, ParsedPage};

/// Client for the product-search endpoint.
///
/// The endpoint takes a `productSearch` form field via POST and responds
/// with a server-rendered results page. Transport failures and non-2xx
/// statuses surface as typed errors; the polling loop treats both as "no
/// data this cycle" for the affected keyword.
pub struct SearchClient {
    client: reqwest::Client,
    search_url: String,
    max_results: usize,
}

impl SearchClient {
    /// Creates a `SearchClient` with configured timeout and `User-Agent`.
    ///
    /// `max_results` caps how many product blocks a single search yields.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        search_url: impl Into<String>,
        timeout_secs: u64,
        user_agent: &str,
        max_results: usize,
    ) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.into(),
            max_results,
        })
    }

    /// Searches the inventory for products matching `query`.
    ///
    /// An empty or whitespace-only query short-circuits to an empty result
    /// without touching the network. A reachable page with no matches is
    /// also an empty result, not an error.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Http`] — transport failure or timeout.
    /// - [`ScraperError::UnexpectedStatus`] — non-2xx response.
    /// - [`ScraperError::UnrecognizedPage`] — results container missing,
    ///   i.e. the upstream page shape changed.
    pub async fn search(&self, query: &str) -> Result<Vec<InventoryRecord>, ScraperError> {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("empty search query; skipping request");
            return Ok(Vec::new());
        }

        tracing::info!(query, "searching inventory");
        let response = self
            .client
            .post(&self.search_url)
            .form(&[("productSearch", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.search_url.clone(),
            });
        }

        let body = response.text().await?;
        match parse_search_page(&body, self.max_results)? {
            ParsedPage::NoResults => {
                tracing::info!(query, "search returned no results");
                Ok(Vec::new())
            }
            ParsedPage::Records(records) => {
                tracing::debug!(query, count = records.len(), "parsed inventory records");
                Ok(records)
            }
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
