use rs_harvester::{extract_html, ExtractionResult, ScrapeOptions};
use std::time::{Duration, Instant};

const URL: &str = "https://example.com/page";

fn extract(html: &str) -> ExtractionResult {
    match extract_html(html, URL, &ScrapeOptions::default()) {
        Ok(result) => result,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    }
}

#[test]
fn extract_does_not_panic_on_malformed_html_unclosed_tags() {
    let result = extract("<p>text<div>more");
    let text = result.data.and_then(|d| d.text).unwrap_or_default();
    assert!(text.contains("text"));
    assert!(text.contains("more"));
}

#[test]
fn extract_does_not_panic_on_malformed_html_invalid_nesting() {
    let result = extract("<p><div></p></div><li>stray</li><tr><td>orphan</td></tr>");
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

#[test]
fn extract_does_not_panic_on_broken_attributes() {
    let result = extract("<div class=\"test id=broken><a href=\"javascript:void(0)\">x</a>");
    assert!(result.data.is_some());
}

#[test]
fn extract_returns_empty_sections_for_empty_string() {
    let data = extract("").data.expect("generic data");
    assert_eq!(data.tables, Some(Vec::new()));
    assert!(data.lists.is_some_and(|l| l.is_empty()));
    assert!(data.article.is_none());
    assert_eq!(data.text.as_deref(), Some(""));
}

#[test]
fn extract_skips_malformed_structured_data() {
    let html = r#"
        <script type="application/ld+json">{"@type": "Product", "name": "Lamp"</script>
        <script type="application/ld+json">{"@type": "Organization", "name": "Shop"}</script>
    "#;
    let structured = extract(html).data.and_then(|d| d.structured_data).expect("structured data");
    assert_eq!(structured.len(), 1);
    assert_eq!(structured[0]["@type"], "Organization");
}

#[test]
fn extract_skips_script_and_style_text() {
    let html = r#"
        <body>
            <script>var SCRIPT_MARKER = 1;</script>
            <style>.STYLE_MARKER { color: red }</style>
            <p>VISIBLE_MARKER</p>
        </body>
    "#;
    let text = extract(html).data.and_then(|d| d.text).unwrap_or_default();
    assert!(text.contains("VISIBLE_MARKER"));
    assert!(!text.contains("SCRIPT_MARKER"));
    assert!(!text.contains("STYLE_MARKER"));
}

#[test]
fn extract_handles_null_bytes_gracefully() {
    let result = extract("<p>before\0after</p>");
    assert!(result.data.is_some());
}

#[test]
fn extract_handles_deep_nesting_without_stack_overflow() {
    let depth = 500;
    let mut html = "<div>".repeat(depth);
    html.push_str("<p>DEEP_MARKER</p>");
    html.push_str(&"</div>".repeat(depth));

    let text = extract(&html).data.and_then(|d| d.text).unwrap_or_default();
    assert!(text.contains("DEEP_MARKER"));
}

#[test]
fn extract_handles_large_html_in_reasonable_time() {
    let mut html = String::from("<html><body>");
    for i in 0..2_000 {
        html.push_str(&format!(
            "<div class=\"item\"><h2>Item {i}</h2><p>Description of item {i} with some filler text.</p>\
             <a href=\"/item/{i}\">details</a></div>"
        ));
    }
    html.push_str("</body></html>");

    let started = Instant::now();
    let result = extract(&html);
    assert!(started.elapsed() < Duration::from_secs(30));

    let links = result.data.and_then(|d| d.links).expect("links");
    assert_eq!(links.internal.len(), 2_000);
}
