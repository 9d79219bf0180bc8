//! Embedded structured data (schema.org JSON-LD).

use dom_query::{Document, Selection};
use serde_json::Value;
use tracing::debug;

/// Parse every `application/ld+json` script block. Malformed blocks are
/// skipped.
#[must_use]
pub fn extract_structured_data(doc: &Document) -> Vec<Value> {
    let mut blocks = Vec::new();

    for script in doc.select(r#"script[type="application/ld+json"]"#).nodes() {
        let text = Selection::from(*script).text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => blocks.push(value),
            Err(e) => debug!(error = %e, "skipping malformed JSON-LD block"),
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_blocks_parsed_malformed_skipped() {
        let doc = Document::from(
            r#"<head>
                <script type="application/ld+json">{"@type": "Article", "headline": "Hi"}</script>
                <script type="application/ld+json">{not json</script>
                <script type="application/ld+json">[{"@type": "Person"}]</script>
                <script type="text/javascript">var x = 1;</script>
            </head>"#,
        );
        let blocks = extract_structured_data(&doc);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["headline"], "Hi");
        assert!(blocks[1].is_array());
    }
}
