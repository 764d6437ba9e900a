use serde::{Deserialize, Serialize};

/// Sentinel shown when a product block carries no price element.
pub const PRICE_UNAVAILABLE: &str = "Price N/A";
/// Sentinel shown when a product block carries no size element.
pub const SIZE_UNAVAILABLE: &str = "Size N/A";

/// One product listing as observed at a single poll.
///
/// Constructed fresh by the extractor on every search; never mutated after
/// construction. `locations` entries are raw `"{address} - {quantity}"`
/// strings exactly as they appear on the listing page — the location
/// classifier in [`crate::locations`] turns them into city/stock pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub name: String,
    /// Retailer PLU code. Many listings omit it; identity then falls back to
    /// the name alone (see [`InventoryRecord::code_or_empty`]).
    pub code: Option<String>,
    pub size: String,
    /// Currency-formatted display text (e.g. `"$29.95"`). Kept as text; only
    /// the diff engine parses it, transiently, for comparison.
    pub price: String,
    /// Free-text status: `"In Stock"`, `"Out of Stock"`, or `"Unknown Stock"`.
    pub availability: String,
    pub locations: Vec<String>,
}

impl InventoryRecord {
    /// The code half of the snapshot identity tuple. A product with no code
    /// is identified by name alone, so absence maps to the empty string.
    #[must_use]
    pub fn code_or_empty(&self) -> &str {
        self.code.as_deref().unwrap_or("")
    }

    /// Whether the availability text reads as in stock.
    #[must_use]
    pub fn availability_in_stock(&self) -> bool {
        self.availability.to_lowercase().contains("in stock")
    }

    /// Whether the availability text reads as out of stock.
    #[must_use]
    pub fn availability_out_of_stock(&self) -> bool {
        self.availability.to_lowercase().contains("out of stock")
    }

    /// An empty location list means unavailable regardless of what the
    /// availability text claims.
    #[must_use]
    pub fn has_locations(&self) -> bool {
        !self.locations.is_empty()
    }
}
