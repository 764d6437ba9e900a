//! MarkdownV2 rendering for change notifications.
//!
//! One message covers every changed item for a (subscriber, keyword) pair in
//! a cycle, capped at [`MAX_ITEMS_PER_MESSAGE`] with a remainder line.
//! Location summaries lean on the city classifier so multi-store items read
//! as "top store per city" instead of a wall of addresses.

use std::collections::BTreeMap;

use abcwatch_core::{classify, InventoryRecord};

/// Telegram message bodies get unwieldy past a handful of items.
pub const MAX_ITEMS_PER_MESSAGE: usize = 5;

/// Cities shown in a multi-city location summary.
const MAX_CITIES_SHOWN: usize = 2;

/// Escape special characters for Telegram MarkdownV2.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    const SPECIAL: [char; 18] = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render the full notification body for one subscriber/keyword.
///
/// `items` pairs each changed record with its change reasons; `footer` is the
/// already-rendered template text appended verbatim.
#[must_use]
pub fn render_notification(
    keyword: &str,
    items: &[(&InventoryRecord, Vec<String>)],
    cities: &[String],
    footer: &str,
) -> String {
    let keyword_escaped = escape_markdown(keyword);

    let mut message = if items.len() == 1 {
        format!("🔔 *Item Update\\!*\n\nYour watchlist keyword '*{keyword_escaped}*' has changes:\n\n")
    } else {
        format!(
            "🔔 *Item Updates\\!*\n\nYour watchlist keyword '*{keyword_escaped}*' has {} items with changes:\n\n",
            items.len()
        )
    };

    for (i, (record, reasons)) in items.iter().take(MAX_ITEMS_PER_MESSAGE).enumerate() {
        let item_text = format_item(record, cities);
        let reasons_text = if reasons.is_empty() {
            String::new()
        } else {
            let escaped: Vec<String> = reasons.iter().map(|r| escape_markdown(r)).collect();
            format!("\n📌 *Changes:* {}", escaped.join(", "))
        };
        let index = i + 1;
        message.push_str(&format!("*{index}\\.* {item_text}{reasons_text}\n\n"));
    }

    if items.len() > MAX_ITEMS_PER_MESSAGE {
        let extra = items.len() - MAX_ITEMS_PER_MESSAGE;
        let plural = if extra == 1 { "" } else { "s" };
        message.push_str(&format!("_\\.\\.\\. and {extra} more item{plural}_\n\n"));
    }

    message.push_str(footer);
    message
}

/// Compact item body: name, size/price detail line, location summary.
fn format_item(record: &InventoryRecord, cities: &[String]) -> String {
    let mut lines = vec![format!("🍾 *{}*", escape_markdown(&record.name))];

    let mut details = Vec::new();
    if !record.size.is_empty() {
        details.push(format!("📏 {}", escape_markdown(&record.size)));
    }
    if !record.price.is_empty() {
        details.push(format!("💰 {}", escape_markdown(&record.price)));
    }
    if !details.is_empty() {
        lines.push(details.join(" • "));
    }

    lines.extend(location_lines(&record.locations, cities));
    lines.join("\n")
}

fn location_lines(locations: &[String], cities: &[String]) -> Vec<String> {
    match locations {
        [] => Vec::new(),
        [single] => {
            let info = classify(single, cities);
            let text = if info.city.is_some() {
                escape_markdown(&info.display)
            } else {
                escape_markdown(single)
            };
            vec![format!("📍 {text}")]
        }
        _ => {
            let groups = group_by_city(locations, cities);
            match groups.as_slice() {
                [] => Vec::new(),
                [(_, stores)] => {
                    let top = escape_markdown(&stores[0].1);
                    let remaining = locations.len() - 1;
                    if remaining > 0 {
                        vec![format!("📍 {top} \\(\\+{remaining} more\\)")]
                    } else {
                        vec![format!("📍 {top}")]
                    }
                }
                _ => multi_city_lines(&groups),
            }
        }
    }
}

fn multi_city_lines(groups: &[(String, Vec<(u32, String)>)]) -> Vec<String> {
    let mut lines = vec!["📍 Available in:".to_string()];

    for (city, stores) in groups.iter().take(MAX_CITIES_SHOWN) {
        lines.push(format!(
            "  *• {}*: {}",
            escape_markdown(city),
            escape_markdown(&stores[0].1)
        ));
    }

    if groups.len() > MAX_CITIES_SHOWN {
        let remaining_cities = groups.len() - MAX_CITIES_SHOWN;
        let remaining_stores: usize = groups
            .iter()
            .skip(MAX_CITIES_SHOWN)
            .map(|(_, stores)| stores.len())
            .sum();
        let label = if remaining_cities == 1 { "y" } else { "ies" };
        lines.push(format!(
            "  _\\.\\.\\. and {remaining_cities} more cit{label} \\({remaining_stores} stores\\)_"
        ));
    }

    lines
}

/// Group classified locations by city, stores sorted by stock within a city,
/// cities ordered by total stock (name as tie-break for stable output).
/// Locations with no classifiable city are dropped from the summary.
fn group_by_city(locations: &[String], cities: &[String]) -> Vec<(String, Vec<(u32, String)>)> {
    let mut by_city: BTreeMap<String, Vec<(u32, String)>> = BTreeMap::new();
    for location in locations {
        let info = classify(location, cities);
        if let Some(city) = info.city {
            by_city.entry(city).or_default().push((info.stock, info.display));
        }
    }

    let mut groups: Vec<(String, Vec<(u32, String)>)> = by_city.into_iter().collect();
    for (_, stores) in &mut groups {
        stores.sort_by(|a, b| b.0.cmp(&a.0));
    }
    groups.sort_by(|a, b| {
        let total_a: u32 = a.1.iter().map(|(stock, _)| *stock).sum();
        let total_b: u32 = b.1.iter().map(|(stock, _)| *stock).sum();
        total_b.cmp(&total_a).then_with(|| a.0.cmp(&b.0))
    });
    groups
}
