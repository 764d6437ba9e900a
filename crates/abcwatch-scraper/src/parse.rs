//! HTML extraction for the retailer's search-results page.
//!
//! The page is semi-structured: a `#productSearchResults` container holding
//! one `div.wake-product` block per listing. Blocks are processed in document
//! order and truncated to the caller's limit.

use scraper::{ElementRef, Html, Selector};

use abcwatch_core::inventory::{InventoryRecord, PRICE_UNAVAILABLE, SIZE_UNAVAILABLE};

use crate::error::ScraperError;

/// Marker text the page renders inside the container when a search matched
/// nothing. Container-present-with-marker is a normal outcome; a missing
/// container means the page shape changed.
const NO_RESULTS_MARKER: &str = "Sorry, your search did not return any results";

/// Outcome of parsing one search-results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPage {
    /// Container present with the explicit no-results marker.
    NoResults,
    /// Zero or more product records, in document order.
    Records(Vec<InventoryRecord>),
}

/// Parse a search-results page body into inventory records.
///
/// # Errors
///
/// Returns [`ScraperError::UnrecognizedPage`] when the results container is
/// absent entirely — the signal that the upstream page shape changed.
pub fn parse_search_page(html: &str, max_results: usize) -> Result<ParsedPage, ScraperError> {
    let document = Html::parse_document(html);

    let container_selector =
        Selector::parse("div#productSearchResults").expect("valid selector");
    let Some(container) = document.select(&container_selector).next() else {
        return Err(ScraperError::UnrecognizedPage {
            context: "results container #productSearchResults missing".to_string(),
        });
    };

    if element_text(container).contains(NO_RESULTS_MARKER) {
        return Ok(ParsedPage::NoResults);
    }

    let product_selector = Selector::parse("div.wake-product").expect("valid selector");
    let records: Vec<InventoryRecord> = container
        .select(&product_selector)
        .take(max_results)
        .map(extract_record)
        .collect();

    if records.is_empty() {
        tracing::warn!("results container present but no product blocks found");
    }

    Ok(ParsedPage::Records(records))
}

/// Extract one product block.
fn extract_record(block: ElementRef<'_>) -> InventoryRecord {
    let name =
        first_text(block, "h4").unwrap_or_else(|| "Unknown Product".to_string());

    let code = first_text(block, "small").and_then(|annotation| {
        annotation
            .contains("PLU:")
            .then(|| annotation.replace("PLU:", "").trim().to_string())
    });

    let price = first_text(block, "span.price").unwrap_or_else(|| PRICE_UNAVAILABLE.to_string());
    let size = first_text(block, "span.size").unwrap_or_else(|| SIZE_UNAVAILABLE.to_string());

    let (availability, locations) = extract_availability(block);

    InventoryRecord {
        name,
        code,
        size,
        price,
        availability,
        locations,
    }
}

/// Availability and per-store location strings for one product block.
///
/// An explicit out-of-stock marker short-circuits to no locations. Otherwise
/// the nested inventory list is scanned for `(address, quantity)` span pairs;
/// finding at least one pair means in stock, finding none with no marker
/// means the page did not say either way.
fn extract_availability(block: ElementRef<'_>) -> (String, Vec<String>) {
    let out_of_stock_selector = Selector::parse("p.out-of-stock").expect("valid selector");
    if block.select(&out_of_stock_selector).next().is_some() {
        return ("Out of Stock".to_string(), Vec::new());
    }

    let item_selector = Selector::parse("div.inventory-collapse li").expect("valid selector");
    let address_selector = Selector::parse("span.address").expect("valid selector");
    let quantity_selector = Selector::parse("span.quantity").expect("valid selector");

    let mut locations = Vec::new();
    for item in block.select(&item_selector) {
        let address = item.select(&address_selector).next().map(element_text);
        let quantity = item.select(&quantity_selector).next().map(element_text);
        let (Some(address), Some(quantity)) = (address, quantity) else {
            continue;
        };
        // Addresses carry line breaks and indentation from the page source.
        let address = address.split_whitespace().collect::<Vec<_>>().join(" ");
        let quantity = quantity.trim();
        locations.push(format!("{address} - {quantity}"));
    }

    if locations.is_empty() {
        ("Unknown Stock".to_string(), locations)
    } else {
        ("In Stock".to_string(), locations)
    }
}

fn first_text(block: ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).expect("valid selector");
    block
        .select(&selector)
        .next()
        .map(|element| element_text(element).trim().to_string())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
