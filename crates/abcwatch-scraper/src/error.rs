use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The search page no longer carries the expected results container.
    /// Distinct from "genuinely no results" so upstream page regressions are
    /// detectable in logs.
    #[error("unrecognized page shape: {context}")]
    UnrecognizedPage { context: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
