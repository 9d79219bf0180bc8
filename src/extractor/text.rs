//! Clean page text.
//!
//! Walks `<body>` in document order, dropping script, style, navigation and
//! footer subtrees. Block elements start new lines; each line is
//! whitespace-normalized and blank lines are dropped.

use dom_query::{Document, NodeRef};

use crate::dom;
use crate::patterns::TEXT_EXCLUDED_TAGS;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "ol",
    "p", "pre", "section", "table", "tr", "ul",
];

enum Step<'a> {
    Visit(NodeRef<'a>),
    LineBreak,
}

/// Page text, one line per block, at most `max_chars` characters.
#[must_use]
pub fn extract_text(doc: &Document, max_chars: usize) -> String {
    let body = doc.select("body");
    let Some(root) = body.nodes().first().copied() else {
        return String::new();
    };

    let mut raw = String::new();
    let mut stack = vec![Step::Visit(root)];

    while let Some(step) = stack.pop() {
        let node = match step {
            Step::LineBreak => {
                raw.push('\n');
                continue;
            }
            Step::Visit(node) => node,
        };

        if node.is_text() {
            raw.push_str(&node.text());
            continue;
        }
        if !node.is_element() {
            continue;
        }

        let name = node.node_name().map(|n| n.to_ascii_lowercase()).unwrap_or_default();
        if TEXT_EXCLUDED_TAGS.contains(&name.as_str()) {
            continue;
        }

        let is_block = BLOCK_TAGS.contains(&name.as_str());
        if is_block {
            raw.push('\n');
            stack.push(Step::LineBreak);
        } else if matches!(name.as_str(), "td" | "th") {
            raw.push(' ');
        }

        for child in node.children().into_iter().rev() {
            stack.push(Step::Visit(child));
        }
    }

    let text = raw
        .lines()
        .map(dom::normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(text, max_chars)
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text,
    }
}
