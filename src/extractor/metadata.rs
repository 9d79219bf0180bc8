//! Head-level metadata.
//!
//! Reads `<title>`, `<meta>` tags (standard names, Open Graph, Twitter
//! cards, Dublin Core, article properties), `<link rel="canonical">` and
//! `<html lang>`. Each field stays absent when none of its sources exist.

use std::collections::HashMap;

use dom_query::{Document, Selection};
use url::Url;

use crate::dom;
use crate::result::Metadata;
use crate::url_utils;

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title", "dc.title"];
const DESCRIPTION_KEYS: &[&str] =
    &["description", "og:description", "twitter:description", "dc.description"];
const IMAGE_KEYS: &[&str] = &["og:image", "og:image:url", "twitter:image", "twitter:image:src"];
const AUTHOR_KEYS: &[&str] = &["author", "article:author", "dc.creator", "parsely-author", "byl"];
const DATE_KEYS: &[&str] = &[
    "article:published_time",
    "og:article:published_time",
    "datepublished",
    "dc.date.issued",
    "dc.date",
    "dcterms.created",
    "date",
    "pubdate",
    "publish_date",
    "parsely-pub-date",
];
const KEYWORD_KEYS: &[&str] = &["keywords", "news_keywords", "parsely-tags"];
const LANGUAGE_KEYS: &[&str] = &["og:locale", "language", "dc.language", "content-language"];
const SITE_NAME_KEYS: &[&str] = &["og:site_name", "application-name", "twitter:site"];

/// Extract metadata for a page served from `url`.
#[must_use]
pub fn extract_metadata(doc: &Document, url: &Url) -> Metadata {
    let meta = collect_meta(doc);
    let first = |keys: &[&str]| keys.iter().find_map(|k| meta.get(*k).cloned());

    let title = doc
        .select("title")
        .nodes()
        .first()
        .map(|n| dom::normalized_text(&Selection::from(*n)))
        .filter(|t| !t.is_empty())
        .or_else(|| first(TITLE_KEYS));

    let image = first(IMAGE_KEYS)
        .map(|raw| url_utils::resolve(&raw, url).map_or(raw, String::from));

    let canonical_url = doc
        .select(r#"link[rel="canonical"]"#)
        .nodes()
        .first()
        .and_then(|n| dom::non_empty_attribute(&Selection::from(*n), "href"))
        .map(|href| url_utils::resolve(&href, url).map_or(href, String::from))
        .or_else(|| meta.get("og:url").cloned());

    let keywords = first(KEYWORD_KEYS).map(|k| split_keywords(&k)).unwrap_or_default();

    let language = doc
        .select("html")
        .nodes()
        .first()
        .and_then(|n| dom::non_empty_attribute(&Selection::from(*n), "lang"))
        .or_else(|| first(LANGUAGE_KEYS))
        .map(|lang| primary_language(&lang))
        .filter(|lang| !lang.is_empty());

    Metadata {
        url: url.to_string(),
        domain: url.host_str().map(str::to_string),
        title,
        description: first(DESCRIPTION_KEYS),
        image,
        canonical_url,
        author: first(AUTHOR_KEYS).filter(|a| is_plausible_name(a)),
        published_date: first(DATE_KEYS),
        keywords,
        language,
        og_type: meta.get("og:type").cloned(),
        site_name: first(SITE_NAME_KEYS),
    }
}

/// First non-empty `content` per lowercased `name`/`property`/`itemprop`.
fn collect_meta(doc: &Document) -> HashMap<String, String> {
    let mut meta = HashMap::new();

    for node in doc.select("meta").nodes() {
        let tag = Selection::from(*node);

        let Some(content) = dom::non_empty_attribute(&tag, "content") else {
            continue;
        };

        for attr in ["name", "property", "itemprop", "http-equiv"] {
            if let Some(key) = dom::non_empty_attribute(&tag, attr) {
                meta.entry(key.to_lowercase()).or_insert_with(|| dom::normalize_whitespace(&content));
            }
        }
    }

    meta
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// `en-US` / `en_US` -> `en`.
fn primary_language(raw: &str) -> String {
    raw.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Rejects author values that are URLs or handles rather than names.
fn is_plausible_name(value: &str) -> bool {
    !(value.starts_with("http://") || value.starts_with("https://") || value.len() > 120)
}
