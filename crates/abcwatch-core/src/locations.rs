//! Heuristic city/stock classification for raw store-location strings.
//!
//! The listing page renders each location as `"<address blob> - <quantity
//! phrase>"` with inconsistent punctuation; the city is embedded in the
//! address blob without a reliable delimiter. Extraction is an ordered
//! cascade of independent matchers, tried in fixed order — the ordering is a
//! deliberate contract, not an optimization, so each matcher stays a separate
//! function rather than one combined regex.

use regex::Regex;

/// Tokens that can never start a city name inside a street fragment.
const STREET_SUFFIXES: [&str; 21] = [
    "St", "Street", "Ave", "Avenue", "Rd", "Road", "Dr", "Drive", "Blvd", "Boulevard", "Ln",
    "Lane", "Ct", "Court", "Pl", "Place", "Cir", "Circle", "Way", "Pkwy", "Parkway",
];

/// Result of classifying one raw location string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    /// Normalized city name, if any heuristic matched.
    pub city: Option<String>,
    /// Numeric stock at this location; 0 when the quantity phrase does not
    /// read as in stock.
    pub stock: u32,
    /// One-line display form, `"{cleaned address} ({quantity})"`, or the
    /// original string when the input was unparsable.
    pub display: String,
}

/// Classify a raw `"{address} - {quantity}"` location string.
///
/// Total function: unparsable input yields `(None, 0, original)` rather than
/// an error. `known_cities` is the reference list used by the concatenated
/// street/city matcher; callers obtain it from the city cache or inject a
/// fixed list in tests.
#[must_use]
pub fn classify(location: &str, known_cities: &[String]) -> LocationInfo {
    let Some((address, quantity)) = split_location(location) else {
        return LocationInfo {
            city: None,
            stock: 0,
            display: location.to_string(),
        };
    };

    let city = extract_city(address, known_cities);
    let clean = clean_address_for_display(address, city.as_deref());
    LocationInfo {
        city,
        stock: stock_quantity(quantity),
        display: format!("{clean} ({quantity})"),
    }
}

/// Parse the numeric stock out of a quantity phrase.
///
/// `"224 in stock"` → 224; anything not containing `"in stock"` → 0.
#[must_use]
pub fn stock_quantity(quantity: &str) -> u32 {
    if !quantity.to_lowercase().contains("in stock") {
        return 0;
    }
    first_digit_run(quantity).unwrap_or(0)
}

/// Aggregate stock across a record's location strings.
///
/// Uses the same split and quantity parsing as [`classify`] so that the
/// snapshot's `total_stock` and the diff engine's current total can never
/// disagree.
#[must_use]
pub fn total_stock(locations: &[String]) -> i64 {
    locations
        .iter()
        .filter_map(|location| split_location(location))
        .map(|(_, quantity)| i64::from(stock_quantity(quantity)))
        .sum()
}

/// Split into (address, quantity); the separator must occur exactly once and
/// both halves must be non-empty.
fn split_location(location: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = location.split(" - ").collect();
    match parts.as_slice() {
        [address, quantity] if !address.is_empty() && !quantity.is_empty() => {
            Some((*address, *quantity))
        }
        _ => None,
    }
}

fn first_digit_run(s: &str) -> Option<u32> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// The matcher cascade. Each matcher is tried in order; the first hit wins.
fn extract_city(address: &str, known_cities: &[String]) -> Option<String> {
    // 1. Period-delimited: "Street.City, State".
    if let Some(candidate) = match_period_delimited(address) {
        if !candidate.is_empty() {
            return clean_city_name(&candidate);
        }
    }

    // 2. Comma pattern "<words>, ST" with known-city suffix matching, then a
    //    word scan over the candidate.
    if let Some(candidate) = match_comma_state(address, known_cities) {
        if !candidate.is_empty() {
            return clean_city_name(&candidate);
        }
    }

    // 3. Comma-only fallback: everything before the first comma.
    if let Some((before, _)) = address.split_once(',') {
        return clean_city_name(before.trim());
    }

    // 4. Ultimate fallback: the whole trimmed address.
    clean_city_name(address.trim())
}

/// Matcher 1: the part after the last `.` and before the next `,`.
fn match_period_delimited(address: &str) -> Option<String> {
    if !(address.contains('.') && address.contains(',')) {
        return None;
    }
    let after_period = address.rsplit('.').next().unwrap_or("");
    let (city, _) = after_period.split_once(',')?;
    Some(city.trim().to_string())
}

/// Matcher 2: `"<words>, <2-letter state>"`. The captured words may be a
/// concatenated "StreetNameCityName" with no separator, so a reference city
/// that is a suffix of the candidate takes priority; otherwise the candidate
/// is scanned word by word.
fn match_comma_state(address: &str, known_cities: &[String]) -> Option<String> {
    if !address.contains(',') {
        return None;
    }
    let pattern = Regex::new(r"([A-Za-z\s]+),\s*[A-Z]{2}").expect("valid regex");
    let candidate = pattern.captures(address)?.get(1)?.as_str().trim().to_string();

    if let Some(known) = known_cities.iter().find(|c| candidate.ends_with(c.as_str())) {
        return Some(known.clone());
    }

    Some(scan_city_words(&candidate))
}

/// Word-scan fallback for matcher 2: skip numbers and street suffixes; the
/// first remaining alphabetic word longer than two characters starts the
/// city, which extends to the end of the candidate.
fn scan_city_words(candidate: &str) -> String {
    let words: Vec<&str> = candidate.split_whitespace().collect();
    if words.len() <= 1 {
        return candidate.to_string();
    }

    for (i, word) in words.iter().enumerate() {
        let has_digit = word.chars().any(|c| c.is_ascii_digit());
        if !has_digit && !STREET_SUFFIXES.contains(word) && word.chars().count() > 2 {
            return words[i..].join(" ");
        }
    }

    candidate.to_string()
}

/// Strip trailing punctuation; empty names collapse to `None`.
fn clean_city_name(city: &str) -> Option<String> {
    let cleaned = city.trim().trim_end_matches(['.', ',', ';', ':']);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Strip the city/state/zip suffix from the address for one-line display,
/// using the same suffix shapes the extraction recognises so display and
/// parsing stay consistent.
fn clean_address_for_display(address: &str, city: Option<&str>) -> String {
    let Some(city) = city else {
        return address.to_string();
    };

    let with_period = format!(".{city}, NC");
    let without_period = format!("{city}, NC");
    let period_only = format!(".{city}");

    if let Some((before, _)) = address.split_once(&with_period) {
        return before.to_string();
    }
    if let Some((before, _)) = address.split_once(&without_period) {
        return before.to_string();
    }
    if address.contains(&period_only) && address.ends_with(city) {
        if let Some((before, _)) = address.split_once(&period_only) {
            return before.to_string();
        }
    }
    if address.ends_with(city) && address.len() > city.len() {
        let stem = &address[..address.len() - city.len()];
        if stem
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_alphabetic())
        {
            return stem.trim_end_matches('.').to_string();
        }
        // "StreetCity" with no separator at all: cut at the last
        // non-alphabetic character inside the stem.
        for (i, c) in stem.char_indices().rev() {
            if !c.is_alphabetic() {
                return stem[..i + c.len_utf8()].trim_end_matches('.').to_string();
            }
        }
    }

    address.to_string()
}
