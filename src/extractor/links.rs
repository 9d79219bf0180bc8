//! Link classification.
//!
//! Links are kept in document order with duplicates. `#fragment` hrefs are
//! in-page anchors; everything else is resolved against the page URL and
//! classified by registrable domain. Non-web schemes (`mailto:`, `tel:`)
//! count as external; `javascript:` and empty hrefs are ignored.

use dom_query::{Document, Selection};
use url::Url;

use crate::result::Links;
use crate::url_utils;

#[must_use]
pub fn extract_links(doc: &Document, base: &Url) -> Links {
    let mut links = Links::default();

    for node in doc.select("a[href]").nodes() {
        let Some(href) = Selection::from(*node).attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }

        if let Some(fragment) = href.strip_prefix('#') {
            if !fragment.is_empty() {
                links.anchors.push(fragment.to_string());
            }
            continue;
        }

        if href
            .get(..11)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
        {
            continue;
        }

        let Some(resolved) = url_utils::resolve(href, base) else {
            continue;
        };

        let is_web = matches!(resolved.scheme(), "http" | "https");
        if is_web && url_utils::is_same_site(&resolved, base) {
            links.internal.push(resolved.to_string());
        } else {
            links.external.push(resolved.to_string());
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(html: &str) -> Links {
        let base = Url::parse("https://www.example.com/blog/post").expect("valid base");
        extract_links(&Document::from(html), &base)
    }

    #[test]
    fn test_classification_and_order() {
        let result = links(
            r##"<a href="/about">About</a>
               <a href="https://other.org/x">Other</a>
               <a href="#comments">Jump</a>
               <a href="https://cdn.example.com/file.pdf">File</a>
               <a href="/about">About again</a>
               <a href="mailto:hi@example.com">Mail</a>
               <a href="javascript:void(0)">JS</a>
               <a href="">Empty</a>
               <a href="#">Top</a>"##,
        );

        assert_eq!(
            result.internal,
            vec![
                "https://www.example.com/about",
                "https://cdn.example.com/file.pdf",
                "https://www.example.com/about",
            ]
        );
        assert_eq!(result.external, vec!["https://other.org/x", "mailto:hi@example.com"]);
        assert_eq!(result.anchors, vec!["comments"]);
    }

    #[test]
    fn test_relative_href_resolves_against_page() {
        let result = links(r#"<a href="next-post">Next</a>"#);
        assert_eq!(result.internal, vec!["https://www.example.com/blog/next-post"]);
    }
}
