//! DOM helpers over `dom_query`.
//!
//! Small, named operations the sub-extractors share: attribute access,
//! whitespace-normalized text, and ancestor lookups by node identity.

pub use dom_query::{Document, NodeRef, Selection};

use crate::patterns::WHITESPACE_NORMALIZE;

/// Parse HTML into a document.
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

/// Tag name of the first node (lowercase).
#[must_use]
pub fn tag_name(sel: &Selection) -> Option<String> {
    sel.nodes()
        .first()
        .and_then(NodeRef::node_name)
        .map(|t| t.to_ascii_lowercase())
}

/// Attribute value as an owned string.
#[inline]
#[must_use]
pub fn get_attribute(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name).map(|s| s.to_string())
}

/// Trimmed, non-empty attribute value.
#[must_use]
pub fn non_empty_attribute(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Text with whitespace runs collapsed to single spaces and trimmed.
#[must_use]
pub fn normalized_text(sel: &Selection) -> String {
    normalize_whitespace(&sel.text())
}

/// Collapse whitespace runs to single spaces and trim.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_NORMALIZE.replace_all(text.trim(), " ").into_owned()
}

/// `class` and `id` joined, for pattern checks on both at once.
#[must_use]
pub fn class_and_id(sel: &Selection) -> String {
    let class = sel.attr("class").map(|s| s.to_string()).unwrap_or_default();
    let id = sel.attr("id").map(|s| s.to_string()).unwrap_or_default();
    format!("{class} {id}").trim().to_string()
}

/// Whether two single-node selections point at the same node.
#[must_use]
pub fn same_node(a: &NodeRef, b: &NodeRef) -> bool {
    a.id == b.id
}

/// Nearest ancestor (excluding the node itself) with the given tag.
#[must_use]
pub fn closest_ancestor<'a>(node: &NodeRef<'a>, tag: &str) -> Option<NodeRef<'a>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.is_element()
            && parent
                .node_name()
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
        {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

/// Whether any ancestor (excluding the node itself) has one of the tags.
#[must_use]
pub fn has_ancestor_tag(node: &NodeRef, tags: &[&str]) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if let Some(name) = parent.node_name() {
            if tags.iter().any(|t| name.eq_ignore_ascii_case(t)) {
                return true;
            }
        }
        current = parent.parent();
    }
    false
}
