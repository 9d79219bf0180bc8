//! URL utility functions.
//!
//! Request URL validation, normalization for fingerprints, relative
//! resolution, and the registrable-domain test used to classify links.

use url::Url;

use crate::error::{Error, Result};

/// Second-level labels under which registrations happen one level deeper
/// (`example.co.uk`, `example.com.au`).
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk",
    "com.au", "net.au", "org.au", "edu.au", "gov.au",
    "co.nz", "org.nz", "govt.nz",
    "co.jp", "ne.jp", "or.jp", "ac.jp",
    "co.in", "org.in", "gov.in",
    "com.br", "org.br", "gov.br",
    "com.cn", "org.cn", "gov.cn", "net.cn",
    "co.za", "org.za",
    "com.mx", "com.ar", "com.tr", "com.sg", "com.hk", "com.tw", "co.kr", "co.il",
];

/// Parse a caller-supplied request URL.
///
/// Accepts only absolute `http`/`https` URLs with a host.
pub fn parse_request_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl { url: raw.to_string(), reason: "empty URL".into() });
    }

    let url = Url::parse(trimmed).map_err(|e| Error::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl { url: raw.to_string(), reason: "missing host".into() });
    }

    Ok(url)
}

/// Canonical string form of a URL for cache keys.
///
/// Scheme and host are already lowercased and default ports dropped by the
/// parser; this also drops the fragment, an empty query, and a trailing
/// slash on non-root paths.
#[must_use]
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    if url.query().is_some_and(str::is_empty) {
        url.set_query(None);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

/// Resolve an href against a base URL.
#[must_use]
pub fn resolve(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

/// Registrable domain of a host: the public suffix plus one label.
///
/// Uses a small table of multi-label suffixes rather than the full public
/// suffix list. IP addresses and single-label hosts are returned unchanged.
#[must_use]
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();

    if host.parse::<std::net::IpAddr>().is_ok() || host.starts_with('[') {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) { 3 } else { 2 };
    labels[labels.len() - keep..].join(".")
}

/// Whether two URLs share a registrable domain.
#[must_use]
pub fn is_same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => registrable_domain(ha) == registrable_domain(hb),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid test URL")
    }

    #[test]
    fn parse_request_url_accepts_http_and_https() {
        assert!(parse_request_url("https://example.com/a").is_ok());
        assert!(parse_request_url("  http://example.com  ").is_ok());
    }

    #[test]
    fn parse_request_url_rejects_bad_input() {
        for raw in ["", "not a url", "ftp://example.com/file", "mailto:me@example.com", "/relative/path"] {
            assert!(
                matches!(parse_request_url(raw), Err(Error::InvalidUrl { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn normalize_url_drops_noise() {
        assert_eq!(
            normalize_url(&url("HTTPS://Example.COM:443/path/#section")),
            "https://example.com/path"
        );
        assert_eq!(normalize_url(&url("https://example.com/?")), "https://example.com/");
        assert_eq!(normalize_url(&url("https://example.com")), "https://example.com/");
        assert_eq!(
            normalize_url(&url("https://example.com/list?page=2")),
            "https://example.com/list?page=2"
        );
    }

    #[test]
    fn resolve_relative_hrefs() {
        let base = url("https://example.com/blog/post.html");
        assert_eq!(resolve("other.html", &base).map(String::from), Some("https://example.com/blog/other.html".into()));
        assert_eq!(resolve("/about", &base).map(String::from), Some("https://example.com/about".into()));
        assert!(resolve("   ", &base).is_none());
    }

    #[test]
    fn registrable_domain_handles_common_shapes() {
        assert_eq!(registrable_domain("www.example.com"), "example.com");
        assert_eq!(registrable_domain("blog.shop.example.com"), "example.com");
        assert_eq!(registrable_domain("news.bbc.co.uk"), "bbc.co.uk");
        assert_eq!(registrable_domain("example.com."), "example.com");
        assert_eq!(registrable_domain("localhost"), "localhost");
        assert_eq!(registrable_domain("192.168.1.10"), "192.168.1.10");
    }

    #[test]
    fn same_site_compares_registrable_domains() {
        assert!(is_same_site(&url("https://www.example.com/"), &url("http://cdn.example.com/x")));
        assert!(!is_same_site(&url("https://example.com/"), &url("https://example.org/")));
        assert!(!is_same_site(&url("https://notexample.com/"), &url("https://example.com/")));
    }
}
