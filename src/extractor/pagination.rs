//! Next-page control detection.
//!
//! The pagination loop advances only when the current page shows an
//! enabled next-page control. A missing control or a disabled one ends the
//! loop; the loop never guesses a fixed page count.

use dom_query::{Document, NodeRef, Selection};
use url::Url;

use crate::dom;
use crate::patterns::{CLICKABLE_SELECTOR, DISABLED_CLASS, NEXT_CONTROL_SELECTORS, NEXT_CONTROL_TEXT};
use crate::url_utils;

/// A next-page control found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextControl {
    /// Absolute target when the control is a real link.
    pub href: Option<Url>,
    /// Selector that activates the control when there is no usable href.
    pub click_selector: Option<String>,
    pub disabled: bool,
}

impl NextControl {
    /// Whether the loop can move past this page.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        !self.disabled && (self.href.is_some() || self.click_selector.is_some())
    }
}

/// Find the next-page control of a page.
///
/// With `selector`, only that selector is consulted. Otherwise the built-in
/// selectors are tried from most to least specific, then clickable elements
/// whose text or label reads like "Next".
#[must_use]
pub fn find_next_control(doc: &Document, base: &Url, selector: Option<&str>) -> Option<NextControl> {
    if let Some(selector) = selector {
        let matches = doc.select(selector);
        let node = matches.nodes().first()?;
        return Some(describe(node, base, Some(selector.to_string())));
    }

    for group in NEXT_CONTROL_SELECTORS {
        let matches = doc.select(group);
        if let Some(node) = matches.nodes().first() {
            return Some(describe(node, base, Some((*group).to_string())));
        }
    }

    let clickables = doc.select(CLICKABLE_SELECTOR);
    clickables
        .nodes()
        .iter()
        .find(|node| {
            let sel = Selection::from(**node);
            let label = dom::non_empty_attribute(&sel, "aria-label")
                .unwrap_or_else(|| dom::normalized_text(&sel));
            NEXT_CONTROL_TEXT.is_match(&label)
        })
        .map(|node| {
            let id_selector = dom::non_empty_attribute(&Selection::from(*node), "id")
                .filter(|id| !id.contains(char::is_whitespace))
                .map(|id| format!("#{id}"));
            describe(node, base, id_selector)
        })
}

fn describe(node: &NodeRef, base: &Url, click_selector: Option<String>) -> NextControl {
    let sel = Selection::from(*node);
    let href = dom::non_empty_attribute(&sel, "href")
        .filter(|h| !h.starts_with('#') && !h.to_ascii_lowercase().starts_with("javascript:"))
        .and_then(|h| url_utils::resolve(&h, base))
        .filter(|u| matches!(u.scheme(), "http" | "https"));

    NextControl { href, click_selector, disabled: is_disabled(node) }
}

/// Disabled by attribute, ARIA state, or a `disabled` class on the control
/// or its immediate wrapper (`<li class="disabled"><a>Next</a></li>`).
fn is_disabled(node: &NodeRef) -> bool {
    let sel = Selection::from(*node);
    if sel.has_attr("disabled") {
        return true;
    }
    if sel
        .attr("aria-disabled")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    if sel.attr("class").is_some_and(|c| DISABLED_CLASS.is_match(&c)) {
        return true;
    }

    node.parent()
        .filter(NodeRef::is_element)
        .and_then(|parent| Selection::from(parent).attr("class"))
        .is_some_and(|c| DISABLED_CLASS.is_match(&c))
}
