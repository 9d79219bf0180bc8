//! Caller-supplied selector extraction.

use dom_query::{Document, Selection};

use crate::dom;
use crate::options::SelectorSpec;

/// Values of every node matching `spec`, in document order.
///
/// Reads the named attribute when the selector carries one (nodes without
/// it are skipped), otherwise the whitespace-normalized text.
#[must_use]
pub fn select_values(doc: &Document, spec: &SelectorSpec) -> Vec<String> {
    let matches = doc.select(&spec.css);

    matches
        .nodes()
        .iter()
        .filter_map(|node| {
            let sel = Selection::from(*node);
            match spec.attribute {
                Some(ref attr) => dom::get_attribute(&sel, attr).map(|v| v.trim().to_string()),
                None => Some(dom::normalized_text(&sel)),
            }
        })
        .collect()
}
