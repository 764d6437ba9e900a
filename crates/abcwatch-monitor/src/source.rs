//! Inventory-source boundary: one fetch per keyword per cycle.

use async_trait::async_trait;

use abcwatch_core::InventoryRecord;
use abcwatch_scraper::{ScraperError, SearchClient};

/// Supplies current inventory records for a keyword.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Vec<InventoryRecord>, ScraperError>;
}

#[async_trait]
impl InventorySource for SearchClient {
    async fn search(&self, keyword: &str) -> Result<Vec<InventoryRecord>, ScraperError> {
        SearchClient::search(self, keyword).await
    }
}
