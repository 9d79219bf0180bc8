//! List extraction.

use dom_query::{Document, Selection};
use indexmap::IndexMap;

use crate::dom;

/// Every `<ul>`/`<ol>` as a sequence of item texts.
///
/// Keys are `{kind}_{position}`, where `position` counts all lists in
/// document order. Lists without non-empty direct `<li>` items are skipped
/// but still consume their position.
#[must_use]
pub fn extract_lists(doc: &Document) -> IndexMap<String, Vec<String>> {
    let mut lists = IndexMap::new();

    for (position, node) in doc.select("ul, ol").nodes().iter().enumerate() {
        let Some(kind) = node.node_name().map(|n| n.to_ascii_lowercase()) else {
            continue;
        };

        let items: Vec<String> = node
            .children()
            .into_iter()
            .filter(|child| child.node_name().is_some_and(|n| n.eq_ignore_ascii_case("li")))
            .map(|li| dom::normalized_text(&Selection::from(li)))
            .filter(|text| !text.is_empty())
            .collect();

        if items.is_empty() {
            continue;
        }
        lists.insert(format!("{kind}_{position}"), items);
    }

    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_keyed_by_kind_and_position() {
        let doc = Document::from(
            "<ul><li>a</li><li> b </li></ul><ol></ol><ol><li>one</li><li>two</li></ol>",
        );
        let lists = extract_lists(&doc);

        assert_eq!(lists.keys().collect::<Vec<_>>(), vec!["ul_0", "ol_2"]);
        assert_eq!(lists["ul_0"], vec!["a", "b"]);
        assert_eq!(lists["ol_2"], vec!["one", "two"]);
    }

    #[test]
    fn test_nested_list_items_stay_with_their_list() {
        let doc = Document::from("<ul><li>top<ul><li>inner</li></ul></li></ul>");
        let lists = extract_lists(&doc);

        assert_eq!(lists["ul_0"].len(), 1);
        assert_eq!(lists["ul_1"], vec!["inner"]);
    }
}
