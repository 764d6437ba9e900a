//! Snapshot-diff engine: previous state vs. current record → notify decision.
//!
//! The five change rules are independent and cumulative: every rule that
//! matches appends its reason. They are deliberately separate functions
//! rather than an if/else chain so that simultaneous changes (say a price
//! drop landing together with a new store) produce both reasons.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::inventory::InventoryRecord;
use crate::locations::total_stock;

/// Total stock below this threshold (and above zero) counts as low.
const LOW_STOCK_THRESHOLD: i64 = 10;

/// Last observed state of one product for one (subscriber, keyword) pair.
///
/// Keyed externally by `(subscriber_id, keyword, product_name,
/// product_code-or-empty)`; exactly one snapshot exists per key and is
/// overwritten on every poll whether or not a notification fired. That
/// unconditional overwrite is what makes the low-stock and availability
/// transition rules edge-triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub price: String,
    pub availability: String,
    pub total_stock: i64,
    pub store_locations: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Capture the state of `record` as it would be persisted.
    #[must_use]
    pub fn of(record: &InventoryRecord, captured_at: DateTime<Utc>) -> Self {
        Self {
            price: record.price.clone(),
            availability: record.availability.clone(),
            total_stock: total_stock(&record.locations),
            store_locations: record.locations.clone(),
            captured_at,
        }
    }

    fn was_available(&self) -> bool {
        !self.store_locations.is_empty() && self.availability == "In Stock"
    }
}

/// Outcome of diffing one record against its previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDecision {
    pub notify: bool,
    pub reasons: Vec<String>,
}

impl ChangeDecision {
    fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            notify: !reasons.is_empty(),
            reasons,
        }
    }
}

/// Decide whether `current` warrants a notification given the previous
/// snapshot, and why.
///
/// Pure: reads no external state. With no prior snapshot the record is new —
/// notify iff it reads as in stock, and no other rules apply. Otherwise all
/// five rules are evaluated and every match contributes a reason.
#[must_use]
pub fn decide(previous: Option<&Snapshot>, current: &InventoryRecord) -> ChangeDecision {
    let Some(previous) = previous else {
        let reasons = if current.availability_in_stock() {
            vec!["Item is now available".to_string()]
        } else {
            Vec::new()
        };
        return ChangeDecision::from_reasons(reasons);
    };

    let current_stock = total_stock(&current.locations);
    let reasons = [
        new_stores(previous, current),
        became_available(previous, current),
        price_drop(previous, current),
        low_stock(previous, current_stock),
        became_unavailable(previous, current),
    ]
    .into_iter()
    .flatten()
    .collect();

    ChangeDecision::from_reasons(reasons)
}

/// Rule 1: the item appeared at stores it was not at last time.
fn new_stores(previous: &Snapshot, current: &InventoryRecord) -> Option<String> {
    let known: HashSet<&str> = previous.store_locations.iter().map(String::as_str).collect();
    let new: HashSet<&str> = current
        .locations
        .iter()
        .map(String::as_str)
        .filter(|location| !known.contains(location))
        .collect();
    if new.is_empty() {
        None
    } else {
        Some(format!("Now available at {} new store(s)", new.len()))
    }
}

/// Rule 2: previously unavailable, now in stock.
fn became_available(previous: &Snapshot, current: &InventoryRecord) -> Option<String> {
    let was_unavailable =
        previous.store_locations.is_empty() || previous.availability != "In Stock";
    (was_unavailable && current.availability_in_stock())
        .then(|| "Item is now available (was previously unavailable)".to_string())
}

/// Rule 3: the price string changed and parses strictly lower.
///
/// Prices are display text (`"$29.95"`, `"Price N/A"`); both sides must
/// survive `$`/`,` stripping and decimal parsing or the rule silently skips.
fn price_drop(previous: &Snapshot, current: &InventoryRecord) -> Option<String> {
    if previous.price.is_empty() || current.price.is_empty() || previous.price == current.price {
        return None;
    }
    let old = parse_price(&previous.price)?;
    let new = parse_price(&current.price)?;
    (new < old).then(|| {
        format!(
            "Price dropped from {} to {}",
            previous.price, current.price
        )
    })
}

/// Rule 4: aggregate stock crossed below the low threshold this cycle.
///
/// One-way edge detector: it fires only on the crossing, because the
/// snapshot written after this decision already carries the reduced count.
fn low_stock(previous: &Snapshot, current_stock: i64) -> Option<String> {
    (current_stock > 0
        && current_stock < LOW_STOCK_THRESHOLD
        && previous.total_stock >= LOW_STOCK_THRESHOLD)
        .then(|| format!("Low stock alert: Only {current_stock} items left"))
}

/// Rule 5: previously available, now gone.
fn became_unavailable(previous: &Snapshot, current: &InventoryRecord) -> Option<String> {
    let now_unavailable = current.locations.is_empty() || current.availability_out_of_stock();
    (previous.was_available() && now_unavailable)
        .then(|| "Item is no longer available".to_string())
}

fn parse_price(price: &str) -> Option<Decimal> {
    price
        .replace(['$', ','], "")
        .trim()
        .parse::<Decimal>()
        .ok()
}
