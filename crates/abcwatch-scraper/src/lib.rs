pub mod cities;
pub mod client;
pub mod error;
pub mod parse;

pub use cities::{CityCache, DEFAULT_CITIES};
pub use client::SearchClient;
pub use error::ScraperError;
pub use parse::{parse_search_page, ParsedPage};
