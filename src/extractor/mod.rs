//! Content classifier and extractor.
//!
//! A pure transform from a [`DomSnapshot`] to an [`ExtractionResult`]. The
//! same snapshot with the same options always yields the same envelope.
//!
//! # Module Structure
//!
//! - `metadata`: head-level tags (title, description, Open Graph, canonical, language)
//! - `article`: scored article detection with reading-time estimate
//! - `tables`: row-oriented tables with header detection
//! - `lists`: `<ul>`/`<ol>` item texts keyed by kind and position
//! - `structured`: JSON-LD blocks
//! - `links`: internal / external / anchor classification
//! - `text`: clean page text
//! - `custom`: caller-supplied selectors
//! - `pagination`: next-page control detection for the pagination loop
//!
//! Each sub-extractor runs isolated: an error or panic in one becomes a
//! warning on the result and its field is omitted, while the others still
//! produce output.
//!
//! # Usage
//!
//! ```rust
//! use rs_harvester::{DomSnapshot, Extractor, ScrapeOptions};
//!
//! let snapshot = DomSnapshot::new(
//!     "<html><body><table><tr><th>a</th></tr><tr><td>1</td></tr></table></body></html>",
//!     "https://example.com/",
//! );
//! let result = Extractor::default().extract(&snapshot, "https://example.com/", &ScrapeOptions::default())?;
//! assert_eq!(result.data.and_then(|d| d.tables).map(|t| t.len()), Some(1));
//! # Ok::<(), rs_harvester::Error>(())
//! ```

pub mod article;
pub mod custom;
pub mod lists;
pub mod links;
pub mod metadata;
pub mod pagination;
pub mod structured;
pub mod tables;
pub mod text;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use dom_query::Document;
use indexmap::IndexMap;
use tracing::warn;
use url::Url;

pub use article::{ArticleScoring, ArticleSignals, ARTICLE_THRESHOLD, WORDS_PER_MINUTE};
pub use pagination::{find_next_control, NextControl};

use crate::dom;
use crate::driver::{DomSnapshot, PageStatus};
use crate::error::{Error, Result};
use crate::options::{EngineConfig, ScrapeOptions};
use crate::result::{ExtractionResult, PageData, ResultStatus};

/// Stateless extractor with its tuning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Extractor {
    /// Article detection weights and threshold.
    pub scoring: ArticleScoring,
    /// Maximum characters of page text.
    pub text_max_chars: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            scoring: ArticleScoring::default(),
            text_max_chars: EngineConfig::default().text_max_chars,
        }
    }
}

impl Extractor {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self { text_max_chars: config.text_max_chars, ..Self::default() }
    }

    /// Classify and extract one snapshot.
    ///
    /// `request_url` is the URL as requested; links and relative metadata
    /// resolve against the snapshot's final URL. Fails only on invalid
    /// caller selectors.
    pub fn extract(
        &self,
        snapshot: &DomSnapshot,
        request_url: &str,
        options: &ScrapeOptions,
    ) -> Result<ExtractionResult> {
        let specs = options.selector_specs()?;
        let doc = dom::parse(&snapshot.html);
        let mut warnings = Vec::new();

        let base = Url::parse(&snapshot.final_url).or_else(|_| Url::parse(request_url));

        let data = if options.runs_generic_extraction() {
            Some(self.extract_generic(&doc, base.as_ref().ok(), &mut warnings))
        } else {
            None
        };

        let custom_data = if specs.is_empty() {
            None
        } else {
            let mut custom = IndexMap::with_capacity(specs.len());
            for (name, spec) in &specs {
                let values = guarded("custom", &mut warnings, || Ok(custom::select_values(&doc, spec)))
                    .unwrap_or_default();
                custom.insert(name.clone(), values);
            }
            Some(custom)
        };

        let status = ResultStatus::from_page_status(snapshot.status);
        let final_url =
            (!snapshot.final_url.is_empty() && snapshot.final_url != request_url).then(|| snapshot.final_url.clone());

        Ok(ExtractionResult {
            url: request_url.to_string(),
            final_url,
            timestamp: snapshot.captured_at,
            status,
            reason: status_reason(snapshot.status),
            data,
            custom_data,
            warnings,
        })
    }

    fn extract_generic(&self, doc: &Document, base: Option<&Url>, warnings: &mut Vec<String>) -> PageData {
        let require_base = || {
            base.ok_or_else(|| Error::InvalidUrl {
                url: String::new(),
                reason: "page has no usable base URL".into(),
            })
        };

        PageData {
            metadata: guarded("metadata", warnings, || {
                Ok(metadata::extract_metadata(doc, require_base()?))
            }),
            article: guarded("article", warnings, || Ok(article::detect_article(doc, &self.scoring)))
                .flatten(),
            text: guarded("text", warnings, || Ok(text::extract_text(doc, self.text_max_chars))),
            tables: guarded("tables", warnings, || Ok(tables::extract_tables(doc))),
            lists: guarded("lists", warnings, || Ok(lists::extract_lists(doc))),
            structured_data: guarded("structured data", warnings, || {
                Ok(structured::extract_structured_data(doc))
            }),
            links: guarded("links", warnings, || Ok(links::extract_links(doc, require_base()?))),
        }
    }
}

/// Run one sub-extractor, turning an error or a panic into a warning.
pub(crate) fn guarded<T>(
    section: &'static str,
    warnings: &mut Vec<String>,
    run: impl FnOnce() -> Result<T>,
) -> Option<T> {
    let failure = match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(e)) => Error::ExtractionPartialFailure { section, reason: e.to_string() },
        Err(payload) => Error::ExtractionPartialFailure { section, reason: panic_message(payload.as_ref()) },
    };

    warn!(section, error = %failure, "sub-extractor failed");
    warnings.push(failure.to_string());
    None
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic in extractor".to_string())
}

fn status_reason(status: PageStatus) -> Option<String> {
    match status {
        PageStatus::Success => None,
        PageStatus::ClientError => Some("server answered with a client error status".into()),
        PageStatus::ServerError => Some("server answered with a server error status".into()),
        PageStatus::Timeout => Some("page did not finish loading".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html lang="en"><head><title>Shop</title></head><body>
        <h1 class="name">Lamp</h1><span class="price">$10</span>
        <ul><li>bright</li><li>small</li></ul>
        <a href="/cart">Cart</a>
    </body></html>"#;

    fn snapshot() -> DomSnapshot {
        DomSnapshot::new(PAGE, "https://shop.example.com/lamp")
    }

    #[test]
    fn test_generic_extraction_fills_every_section() {
        let result = Extractor::default()
            .extract(&snapshot(), "https://shop.example.com/lamp", &ScrapeOptions::default())
            .expect("extracted");

        assert_eq!(result.status, ResultStatus::Success);
        assert!(result.final_url.is_none());
        assert!(result.warnings.is_empty());
        assert!(result.custom_data.is_none());

        let data = result.data.expect("generic data");
        assert_eq!(data.metadata.and_then(|m| m.title).as_deref(), Some("Shop"));
        assert!(data.article.is_none());
        assert_eq!(data.lists.map(|l| l.len()), Some(1));
        assert_eq!(data.tables.map(|t| t.len()), Some(0));
        assert_eq!(
            data.links.map(|l| l.internal),
            Some(vec!["https://shop.example.com/cart".to_string()])
        );
    }

    #[test]
    fn test_custom_only_when_extract_all_disabled() {
        let options = ScrapeOptions::default()
            .with_extract_all(false)
            .with_selector("price", ".price")
            .with_selector("missing", ".nothing");
        let result = Extractor::default()
            .extract(&snapshot(), "https://shop.example.com/lamp", &options)
            .expect("extracted");

        assert!(result.data.is_none());
        let custom = result.custom_data.expect("custom data");
        assert_eq!(custom["price"], vec!["$10"]);
        assert!(custom["missing"].is_empty());
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let options = ScrapeOptions::default().with_selector("bad", "p[[");
        let result = Extractor::default().extract(&snapshot(), "https://shop.example.com/lamp", &options);
        assert!(matches!(result, Err(Error::InvalidSelector { .. })));
    }

    #[test]
    fn test_redirect_and_status_are_reported() {
        let snap = DomSnapshot::new(PAGE, "https://shop.example.com/lamp-v2").with_status(PageStatus::ServerError);
        let result = Extractor::default()
            .extract(&snap, "https://shop.example.com/lamp", &ScrapeOptions::default())
            .expect("extracted");

        assert_eq!(result.status, ResultStatus::ServerError);
        assert!(result.reason.is_some());
        assert_eq!(result.final_url.as_deref(), Some("https://shop.example.com/lamp-v2"));
    }

    #[test]
    fn test_guard_turns_failures_into_warnings() {
        let mut warnings = Vec::new();

        let failed: Option<u32> = guarded("tables", &mut warnings, || {
            Err(Error::Config("boom".into()))
        });
        assert!(failed.is_none());

        let panicked: Option<u32> = guarded("lists", &mut warnings, || panic!("selector engine exploded"));
        assert!(panicked.is_none());

        let ok = guarded("links", &mut warnings, || Ok(7));
        assert_eq!(ok, Some(7));

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("tables extraction failed"));
        assert!(warnings[1].contains("selector engine exploded"));
    }

    #[test]
    fn test_missing_base_url_drops_only_url_sections() {
        let snap = DomSnapshot::new(PAGE, "");
        let result = Extractor::default()
            .extract(&snap, "not a url", &ScrapeOptions::default())
            .expect("extracted");

        let data = result.data.expect("generic data");
        assert!(data.metadata.is_none());
        assert!(data.links.is_none());
        assert!(data.lists.is_some());
        assert_eq!(result.warnings.len(), 2);
    }
}
