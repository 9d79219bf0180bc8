//! # rs-harvester
//!
//! Fetch-extract engine: drives a browser session to a page, captures the
//! rendered DOM, and turns it into a structured result (metadata, article,
//! tables, lists, JSON-LD, links, text, and caller-selected fields).
//!
//! Around that core sit a freshness cache keyed by request fingerprint and
//! an admission throttle that paces requests with a sliding window and an
//! adaptive gap.
//!
//! ## Quick Start
//!
//! ```rust
//! use rs_harvester::{extract_html, ScrapeOptions};
//!
//! let html = r#"<html><head><title>Prices</title></head>
//! <body><span class="price">$10</span></body></html>"#;
//!
//! let options = ScrapeOptions::default().with_selector("price", ".price");
//! let result = extract_html(html, "https://shop.example.com/", &options)?;
//! assert_eq!(result.title(), Some("Prices"));
//! assert_eq!(result.custom_data.unwrap()["price"], vec!["$10"]);
//! # Ok::<(), rs_harvester::Error>(())
//! ```
//!
//! Live retrieval goes through a [`Scraper`] over any [`BrowserDriver`]:
//!
//! ```rust
//! use rs_harvester::testing::MockDriver;
//! use rs_harvester::{EngineConfig, Scraper};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rs_harvester::Result<()> {
//! let driver = MockDriver::new().with_html("https://example.com/", "<p>hello</p>");
//! let mut scraper = Scraper::new(driver, EngineConfig::default())?;
//! let result = scraper.scrape_url("https://example.com/").await?;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```

mod error;
mod options;
mod patterns;
mod result;

/// Wall-clock abstraction for cache timestamps.
pub mod clock;

/// DOM helpers over `dom_query`.
pub mod dom;

/// URL validation, resolution, normalization and site comparison.
pub mod url_utils;

/// Request fingerprints and the TTL freshness cache.
pub mod cache;

/// Sliding-window admission throttle with adaptive gap.
pub mod throttle;

/// Browser session capability and DOM snapshots.
pub mod driver;

/// Content classifier and structured extraction.
pub mod extractor;

/// Single-session orchestrator and worker pool.
pub mod scraper;

/// JSON and CSV export of results.
pub mod export;

/// Scripted driver and manual clock for tests.
pub mod testing;

// Public API - re-exports
pub use cache::{CacheEntry, CacheStats, Fingerprint, FreshnessCache};
pub use clock::{Clock, SystemClock};
pub use driver::{BrowserDriver, DomSnapshot, DriverConfig, DriverFactory, NavigationOutcome, PageStatus};
pub use error::{Error, Result};
pub use extractor::Extractor;
pub use options::{EngineConfig, PaginationOptions, ScrapeOptions, ScrapeRequest, SelectorSpec};
pub use result::{
    Article, ExtractionResult, Links, Metadata, PageData, PaginatedResult, PaginationStop, ResultStatus, Table,
};
pub use scraper::{Scraper, ScraperPool, ScraperStatus};
pub use throttle::{AdmissionThrottle, ThrottleConfig, ThrottleStats};

/// Extracts an HTML document that is already in hand, without a browser.
///
/// `url` is the page address used for link classification and relative
/// metadata. Fails only on invalid caller selectors.
///
/// # Example
///
/// ```rust
/// use rs_harvester::{extract_html, ScrapeOptions};
///
/// let html = "<table><tr><th>a</th></tr><tr><td>1</td></tr></table>";
/// let result = extract_html(html, "https://example.com/", &ScrapeOptions::default())?;
/// assert_eq!(result.data.and_then(|d| d.tables).map(|t| t.len()), Some(1));
/// # Ok::<(), rs_harvester::Error>(())
/// ```
pub fn extract_html(html: &str, url: &str, options: &ScrapeOptions) -> Result<ExtractionResult> {
    Extractor::default().extract(&DomSnapshot::new(html, url), url, options)
}
