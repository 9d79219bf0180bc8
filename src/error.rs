//! Error types for rs-harvester.
//!
//! Only request-shape problems (`InvalidUrl`, `InvalidSelector`, `Config`)
//! escape the orchestrator. Retrieval and extraction problems are folded into
//! a degraded [`ExtractionResult`](crate::ExtractionResult) so batches keep going.

/// Error type for harvesting operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request URL could not be parsed or is not an http(s) URL.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A caller-supplied CSS selector failed to parse.
    #[error("invalid selector {name:?}: {selector:?}")]
    InvalidSelector { name: String, selector: String },

    /// Engine configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Page load did not finish before the navigation timeout.
    #[error("navigation timed out: {url}")]
    NavigationTimeout { url: String },

    /// DNS, connection or protocol failure while navigating.
    #[error("navigation failed for {url}: {reason}")]
    NavigationError { url: String, reason: String },

    /// A wait-for-selector condition never became true.
    #[error("condition timed out waiting for {selector:?}")]
    ConditionTimeout { selector: String },

    /// One sub-extractor failed; the others still produced output.
    #[error("{section} extraction failed: {reason}")]
    ExtractionPartialFailure { section: &'static str, reason: String },

    /// Cache backend could not be read or written. Always treated as a miss.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A value could not be rendered in the requested export format.
    #[error("export failed: {0}")]
    Export(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for harvesting operations.
pub type Result<T> = std::result::Result<T, Error>;
