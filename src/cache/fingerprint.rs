//! Request fingerprints.
//!
//! A fingerprint is the SHA-256 of a canonical string built from the
//! normalized URL and the extraction parameters that change the result
//! (`extract_all` and the selector set). Wait and scroll options only affect
//! how the page is reached, so they are not part of the key.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use url::Url;

use crate::options::ScrapeOptions;
use crate::url_utils::normalize_url;

/// Bumped whenever the canonical form changes, so stale disk entries miss.
const FINGERPRINT_VERSION: &str = "v2";

/// Deterministic cache key of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a request URL with its options.
    #[must_use]
    pub fn of(url: &Url, options: &ScrapeOptions) -> Self {
        Self::from_canonical(&canonical_form(url, options))
    }

    /// Hash an already canonical string.
    #[must_use]
    pub fn from_canonical(canonical: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Lowercase hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical string form of a request.
///
/// Encoded as a JSON array so free-text selector names and CSS cannot run
/// into each other. Selectors are sorted by name so insertion order does
/// not matter.
#[must_use]
pub fn canonical_form(url: &Url, options: &ScrapeOptions) -> String {
    let mut selectors: Vec<(&str, &str)> =
        options.selectors.iter().map(|(name, css)| (name.as_str(), css.trim())).collect();
    selectors.sort_unstable();

    let selector_part: Vec<Value> = selectors
        .into_iter()
        .map(|(name, css)| Value::from(vec![name, css]))
        .collect();

    Value::Array(vec![
        Value::from(FINGERPRINT_VERSION),
        Value::from(normalize_url(url)),
        Value::Bool(options.extract_all),
        Value::Array(selector_part),
    ])
    .to_string()
}
