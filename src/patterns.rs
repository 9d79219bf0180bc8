//! Compiled regex patterns and CSS selectors used by the extractor.
//!
//! All patterns are compiled once at first use with `LazyLock`.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Block Classification Patterns
// =============================================================================

/// Class/id names of navigation and chrome blocks. These never become
/// article candidates.
///
/// `nav` only matches as a whole token or at a token edge so layout names
/// like `in-page-nav-container` stay eligible.
pub static NAVIGATION_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^nav$|^nav[-_]|[-_]nav$|navbar|navigation|\bmenu\b|site[-_]?(?:header|footer)|breadcrumbs?|sidebar|\bwidget\b|cookie|newsletter|\bfooter\b|comments?\b|related|share|social|promo|\bads?\b|advert)",
    )
    .expect("NAVIGATION_CLASS regex")
});

/// Class/id names that suggest the block holds article content.
pub static ARTICLE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|post|entry|story|content|blog|body|main)").expect("ARTICLE_CLASS regex")
});

/// Class/id/rel markers of a byline.
pub static BYLINE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(byline|author|writer|contributor)").expect("BYLINE_CLASS regex")
});

/// Class/id markers of a publication date.
pub static DATE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(date|time|published|posted|dateline|timestamp)").expect("DATE_CLASS regex")
});

/// "By Jane Doe" style byline text at the start of a short block.
pub static BYLINE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:by|written by|posted by|author:)\s+(\S.{1,80})$").expect("BYLINE_TEXT regex")
});

/// Date shapes: `2024-03-01`, `03/01/2024`, `March 1, 2024`, `1 March 2024`.
pub static DATE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{4}|\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}|\b\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+\d{4})",
    )
    .expect("DATE_TEXT regex")
});

// =============================================================================
// Pagination Patterns
// =============================================================================

/// Visible text or label of a next-page control.
pub static NEXT_CONTROL_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:next(?:\s+page)?|older(?:\s+posts)?|more|»|›|→|>)\s*(?:»|›|→|>)?\s*$")
        .expect("NEXT_CONTROL_TEXT regex")
});

/// Class names that mark a control as disabled.
pub static DISABLED_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[\s_-])(disabled|inactive|is-disabled)($|[\s_-])").expect("DISABLED_CLASS regex")
});

// =============================================================================
// Text and Selector Syntax Patterns
// =============================================================================

/// Matches whitespace runs for normalization.
pub static WHITESPACE_NORMALIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("WHITESPACE_NORMALIZE regex")
});

/// `css@attr` form of a custom selector. The attribute part must be a bare
/// attribute name at the very end.
pub static ATTRIBUTE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*@([A-Za-z_][A-Za-z0-9_:.-]*)$").expect("ATTRIBUTE_SUFFIX regex")
});

// =============================================================================
// CSS Selectors
// =============================================================================

/// Blocks considered as article containers.
pub const ARTICLE_CANDIDATE_SELECTOR: &str =
    "article, main, [role='main'], [role='article'], section, div";

/// Author markers inside a candidate block.
pub const AUTHOR_SELECTOR: &str =
    "[rel='author'], [itemprop='author'], .author, .byline, [class*='author'], [class*='byline']";

/// Date markers inside a candidate block.
pub const DATE_SELECTOR: &str =
    "time, [datetime], [itemprop='datePublished'], .date, [class*='date'], [class*='published']";

/// Built-in next-page control candidates, most specific first.
pub const NEXT_CONTROL_SELECTORS: &[&str] = &[
    "a[rel~='next'], link[rel~='next'], button[rel~='next']",
    "[aria-label='Next'], [aria-label='Next page'], [aria-label='next']",
    ".pagination .next, .pager .next, .pagination-next, .next-page, li.next > a, a.next, button.next",
];

/// Generic clickable elements scanned for next-page text.
pub const CLICKABLE_SELECTOR: &str = "a, button, [role='button']";

/// Elements whose text is dropped from the page text.
pub const TEXT_EXCLUDED_TAGS: &[&str] =
    &["script", "style", "nav", "footer", "iframe", "noscript", "template", "svg", "head"];
