//! Result envelope types.
//!
//! The field set is stable across sites: absent sub-objects are omitted
//! when serialized rather than null-filled, except `customData`, whose keys
//! always mirror the requested selector names.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::PageStatus;

/// Outcome classification of one scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Page retrieved and extracted.
    Success,
    /// Page retrieved, but a wait condition never became true; content may be incomplete.
    ConditionTimeout,
    /// Navigation or the overall request deadline timed out.
    Timeout,
    /// DNS, connection or other navigation failure.
    NavigationError,
    /// The server answered with a 4xx status.
    ClientError,
    /// The server answered with a 5xx status.
    ServerError,
    /// The request itself was invalid (bad URL). Only produced inside batches.
    InvalidRequest,
}

impl ResultStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Status implied by a snapshot's page status.
    #[must_use]
    pub fn from_page_status(status: PageStatus) -> Self {
        match status {
            PageStatus::Success => Self::Success,
            PageStatus::ClientError => Self::ClientError,
            PageStatus::ServerError => Self::ServerError,
            PageStatus::Timeout => Self::Timeout,
        }
    }
}

/// Result of scraping one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// The URL as requested.
    pub url: String,

    /// Resolved URL after redirects, when it differs from `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,

    /// When the snapshot was extracted.
    pub timestamp: DateTime<Utc>,

    pub status: ResultStatus,

    /// Human-readable reason for a non-success status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Generic extraction output. Omitted when only custom selectors were requested
    /// or when nothing could be retrieved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PageData>,

    /// Selector name to matched values, in document order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<IndexMap<String, Vec<String>>>,

    /// Non-fatal problems: failed sub-extractors, timed-out waits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    /// A degraded result for a request that produced no snapshot.
    ///
    /// `custom_data` still carries every requested selector name, each with
    /// no matches.
    #[must_use]
    pub fn failed<'a>(
        url: impl Into<String>,
        status: ResultStatus,
        reason: impl Into<String>,
        selector_names: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        let custom: IndexMap<String, Vec<String>> =
            selector_names.into_iter().map(|name| (name.clone(), Vec::new())).collect();

        Self {
            url: url.into(),
            final_url: None,
            timestamp: Utc::now(),
            status,
            reason: Some(reason.into()),
            data: None,
            custom_data: if custom.is_empty() { None } else { Some(custom) },
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Page title from metadata or the detected article.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        let data = self.data.as_ref()?;
        data.metadata
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .or_else(|| data.article.as_ref().map(|a| a.title.as_str()))
    }
}

/// Output of the generic sub-extractors. A field is omitted when its
/// sub-extractor failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Present only when the page is judged article-like.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<Article>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Tables in document order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<Table>>,

    /// Lists keyed `ul_{n}` / `ol_{n}`, where `n` is the list's document position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lists: Option<IndexMap<String, Vec<String>>>,

    /// Parsed schema.org JSON-LD blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

/// Head-level metadata. Each field is absent when its source tag is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// URL the page was extracted from.
    pub url: String,

    /// Hostname of `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Open Graph / Twitter image, resolved to an absolute URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Publication date as declared by the page (not reformatted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Primary language subtag, lowercase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

/// The single most article-like block of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    /// `"{n} min read"`.
    pub estimated_read_time: String,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Row-oriented table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Header row, when one is distinguishable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Table {
    /// Number of columns of the widest row (headers included).
    #[must_use]
    pub fn width(&self) -> usize {
        let header_width = self.headers.as_ref().map_or(0, Vec::len);
        self.rows.iter().map(Vec::len).max().unwrap_or(0).max(header_width)
    }
}

/// Hyperlinks in document order, duplicates kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    pub internal: Vec<String>,
    pub external: Vec<String>,
    /// Fragment names of in-page anchors, without the `#`.
    pub anchors: Vec<String>,
}

/// Why the pagination loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStop {
    /// No next-page control was found on the last page.
    NoNextControl,
    /// The next-page control was present but disabled.
    NextControlDisabled,
    /// The configured page cap was reached.
    PageCap,
    /// Advancing led back to an already visited page.
    Cycle,
    /// A page failed to load; earlier pages are kept.
    RetrievalFailed,
}

/// Accumulated results of a pagination run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult {
    /// Starting URL.
    pub url: String,
    /// One result per visited page, in visiting order.
    pub pages: Vec<ExtractionResult>,
    pub stop_reason: PaginationStop,
}

impl PaginatedResult {
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All tables of all pages, in page then document order.
    #[must_use]
    pub fn tables(&self) -> Vec<&Table> {
        self.pages
            .iter()
            .filter_map(|p| p.data.as_ref())
            .filter_map(|d| d.tables.as_ref())
            .flatten()
            .collect()
    }

    /// Custom-selector values of all pages, concatenated per selector name.
    #[must_use]
    pub fn merged_custom_data(&self) -> IndexMap<String, Vec<String>> {
        let mut merged: IndexMap<String, Vec<String>> = IndexMap::new();
        for page in &self.pages {
            if let Some(ref custom) = page.custom_data {
                for (name, values) in custom {
                    merged.entry(name.clone()).or_default().extend(values.iter().cloned());
                }
            }
        }
        merged
    }
}
