//! Configuration surface and request envelope.
//!
//! [`EngineConfig`] holds engine-wide settings (cache, pacing, browser,
//! deadlines). [`ScrapeOptions`] holds the per-request overrides and
//! [`ScrapeRequest`] pairs them with a URL.

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::driver::DriverConfig;
use crate::error::{Error, Result};
use crate::patterns::ATTRIBUTE_SUFFIX;
use crate::throttle::ThrottleConfig;

/// Engine-wide configuration.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings and [`EngineConfig::validate`] before use.
///
/// # Example
///
/// ```rust
/// use rs_harvester::EngineConfig;
///
/// let config = EngineConfig {
///     requests_per_minute: 10,
///     cache_ttl_hours: 6,
///     ..EngineConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct EngineConfig {
    /// Enable the freshness cache.
    ///
    /// Default: `true`
    pub cache_enabled: bool,

    /// Time-to-live for cached results, in hours. `0` bypasses the cache.
    ///
    /// Default: `24`
    pub cache_ttl_hours: u64,

    /// Directory for a durable cache. `None` keeps entries in memory.
    ///
    /// Default: `None`
    pub cache_dir: Option<PathBuf>,

    /// Admission budget for any trailing 60-second window.
    ///
    /// Default: `30`
    pub requests_per_minute: u32,

    /// Lower bound of the adaptive inter-request gap, in milliseconds.
    ///
    /// Default: `2000` (60 s / 30 requests)
    pub gap_floor_ms: u64,

    /// Upper bound of the adaptive inter-request gap, in milliseconds.
    ///
    /// Default: `20000` (10x the floor)
    pub gap_ceiling_ms: u64,

    /// Factor the gap is multiplied by after a failed retrieval (> 1).
    ///
    /// Default: `1.5`
    pub failure_backoff: f64,

    /// Factor the gap is multiplied by after a successful retrieval (0..1).
    ///
    /// Default: `0.8`
    pub success_recovery: f64,

    /// Run the browser without a visible window.
    ///
    /// Default: `true`
    pub headless: bool,

    /// User agent handed to the browser driver.
    pub user_agent: String,

    /// Page-load timeout for a single navigation, in milliseconds.
    ///
    /// Default: `30000`
    pub navigation_timeout_ms: u64,

    /// Timeout for `wait_for_selector` conditions, in milliseconds.
    ///
    /// Default: `10000`
    pub condition_timeout_ms: u64,

    /// Scroll-to-bottom repetitions when lazy loading is requested.
    ///
    /// Default: `5`
    pub lazy_load_iterations: u32,

    /// Settle delay after each scroll, in milliseconds.
    ///
    /// Default: `500`
    pub lazy_load_settle_ms: u64,

    /// Overall deadline for one retrieval (navigate through snapshot), in milliseconds.
    ///
    /// Default: `90000`
    pub request_deadline_ms: u64,

    /// Number of concurrent workers in a [`ScraperPool`](crate::ScraperPool).
    /// Each worker owns its own browser session.
    ///
    /// Default: `1`
    pub workers: usize,

    /// Maximum number of pages visited by the pagination loop.
    ///
    /// Default: `10`
    pub max_pages: usize,

    /// Maximum length of the extracted page text, in characters.
    ///
    /// Default: `10000`
    pub text_max_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_hours: 24,
            cache_dir: None,
            requests_per_minute: 30,
            gap_floor_ms: 2_000,
            gap_ceiling_ms: 20_000,
            failure_backoff: 1.5,
            success_recovery: 0.8,
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout_ms: 30_000,
            condition_timeout_ms: 10_000,
            lazy_load_iterations: 5,
            lazy_load_settle_ms: 500,
            request_deadline_ms: 90_000,
            workers: 1,
            max_pages: 10,
            text_max_chars: 10_000,
        }
    }
}

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl EngineConfig {
    /// Check the configuration for inconsistent values.
    pub fn validate(&self) -> Result<()> {
        self.throttle_config().validate()?;
        if self.workers == 0 {
            return Err(Error::Config("workers must be > 0".into()));
        }
        if self.max_pages == 0 {
            return Err(Error::Config("max_pages must be > 0".into()));
        }
        if self.request_deadline_ms == 0 {
            return Err(Error::Config("request_deadline_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Cache time-to-live. Zero when caching is disabled.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        if self.cache_enabled {
            Duration::from_secs(self.cache_ttl_hours.saturating_mul(3600))
        } else {
            Duration::ZERO
        }
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    #[must_use]
    pub fn condition_timeout(&self) -> Duration {
        Duration::from_millis(self.condition_timeout_ms)
    }

    #[must_use]
    pub fn lazy_load_settle(&self) -> Duration {
        Duration::from_millis(self.lazy_load_settle_ms)
    }

    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }

    /// Throttle settings derived from this configuration.
    #[must_use]
    pub fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig {
            requests_per_minute: self.requests_per_minute,
            gap_floor: Duration::from_millis(self.gap_floor_ms),
            gap_ceiling: Duration::from_millis(self.gap_ceiling_ms),
            failure_backoff: self.failure_backoff,
            success_recovery: self.success_recovery,
        }
    }

    /// Settings handed to the browser driver factory.
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            headless: self.headless,
            user_agent: self.user_agent.clone(),
            window_size: (1920, 1080),
            page_load_timeout: self.navigation_timeout(),
        }
    }
}

/// Per-request overrides.
///
/// Field names serialize in camelCase (`extractAll`, `waitForSelector`,
/// `useCache`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeOptions {
    /// Named CSS selectors for custom extraction. A selector may end in
    /// `@attr` to collect that attribute instead of the node text.
    pub selectors: IndexMap<String, String>,

    /// Run every generic sub-extractor regardless of `selectors`.
    ///
    /// Default: `true`
    pub extract_all: bool,

    /// Wait for this selector to be present before taking the snapshot.
    pub wait_for_selector: Option<String>,

    /// Scroll to trigger lazy-loaded content before the snapshot.
    pub scroll: bool,

    /// Serve from and store into the freshness cache.
    ///
    /// Default: `true`
    pub use_cache: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            selectors: IndexMap::new(),
            extract_all: true,
            wait_for_selector: None,
            scroll: false,
            use_cache: true,
        }
    }
}

impl ScrapeOptions {
    /// Add a named selector.
    #[must_use]
    pub fn with_selector(mut self, name: impl Into<String>, selector: impl Into<String>) -> Self {
        self.selectors.insert(name.into(), selector.into());
        self
    }

    #[must_use]
    pub fn with_extract_all(mut self, extract_all: bool) -> Self {
        self.extract_all = extract_all;
        self
    }

    #[must_use]
    pub fn with_wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_scroll(mut self, scroll: bool) -> Self {
        self.scroll = scroll;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Whether the generic sub-extractors run for these options.
    ///
    /// `extract_all = false` with selectors yields custom data only; with no
    /// selectors there is nothing else to return, so generic extraction runs.
    #[must_use]
    pub fn runs_generic_extraction(&self) -> bool {
        self.extract_all || self.selectors.is_empty()
    }

    /// Parse and syntax-check every selector, preserving caller order.
    pub fn selector_specs(&self) -> Result<Vec<(String, SelectorSpec)>> {
        self.selectors
            .iter()
            .map(|(name, raw)| {
                let spec = SelectorSpec::parse(raw);
                spec.validate(name)?;
                Ok((name.clone(), spec))
            })
            .collect()
    }

    /// Syntax-check the selectors and the wait condition.
    pub fn validate(&self) -> Result<()> {
        self.selector_specs()?;
        if let Some(ref wait) = self.wait_for_selector {
            if dom_query::Matcher::new(wait).is_err() {
                return Err(Error::InvalidSelector {
                    name: "waitForSelector".to_string(),
                    selector: wait.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A custom selector: CSS plus an optional attribute to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub css: String,
    pub attribute: Option<String>,
}

impl SelectorSpec {
    /// Parse `css` or `css@attr`.
    ///
    /// The suffix is only treated as an attribute when it looks like an
    /// attribute name, so `a[href*="@"]` stays a plain selector.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(caps) = ATTRIBUTE_SUFFIX.captures(raw) {
            if let (Some(css), Some(attr)) = (caps.get(1), caps.get(2)) {
                return Self {
                    css: css.as_str().trim().to_string(),
                    attribute: Some(attr.as_str().to_string()),
                };
            }
        }
        Self { css: raw.to_string(), attribute: None }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.css.is_empty() || dom_query::Matcher::new(&self.css).is_err() {
            return Err(Error::InvalidSelector {
                name: name.to_string(),
                selector: self.css.clone(),
            });
        }
        Ok(())
    }
}

/// Request envelope: a URL plus its per-request options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(flatten)]
    pub options: ScrapeOptions,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), options: ScrapeOptions::default() }
    }

    #[must_use]
    pub fn with_options(mut self, options: ScrapeOptions) -> Self {
        self.options = options;
        self
    }
}

/// Controls for the pagination loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationOptions {
    /// Selector of the next-page control. `None` uses the built-in
    /// detection (`rel="next"`, `.next`, `aria-label="Next"`, ...).
    pub next_selector: Option<String>,

    /// Page cap for this run. `None` uses [`EngineConfig::max_pages`].
    pub max_pages: Option<usize>,
}
