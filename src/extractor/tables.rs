//! Table extraction.
//!
//! Every data table becomes a row-oriented [`Table`] in document order.
//! `colspan`/`rowspan` cells are repeated into each grid slot they cover so
//! rows line up with the header. Nested tables are extracted on their own
//! and their rows are not attributed to the enclosing table.

use dom_query::{Document, NodeRef, Selection};

use crate::dom;
use crate::result::Table;

/// Cap on expanded cells per table.
const MAX_TABLE_CELLS: usize = 20_000;

/// Cap on a single `colspan`/`rowspan` value.
const MAX_SPAN: usize = 1_000;

/// Extract every data table in the document.
#[must_use]
pub fn extract_tables(doc: &Document) -> Vec<Table> {
    let mut tables = Vec::new();

    for node in doc.select("table").nodes() {
        let table = Selection::from(*node);
        if is_layout_table(&table) {
            continue;
        }
        if let Some(converted) = convert_table(node, &table) {
            tables.push(converted);
        }
    }

    tables
}

fn is_layout_table(table: &Selection) -> bool {
    table.attr("role").is_some_and(|role| {
        role.eq_ignore_ascii_case("presentation") || role.eq_ignore_ascii_case("none")
    })
}

struct RawCell {
    text: String,
    colspan: usize,
    rowspan: usize,
    is_header: bool,
}

fn convert_table(node: &NodeRef, table: &Selection) -> Option<Table> {
    let mut spans: Vec<Option<(usize, String)>> = Vec::new();
    let mut grid: Vec<(Vec<String>, bool)> = Vec::new();
    let mut total_cells: usize = 0;

    for tr in own_rows(node, table) {
        if total_cells >= MAX_TABLE_CELLS {
            break;
        }

        let cells = row_cells(&tr);
        if cells.is_empty() && spans.iter().all(Option::is_none) {
            continue;
        }

        let in_thead = tr
            .parent()
            .and_then(|p| p.node_name())
            .is_some_and(|name| name.eq_ignore_ascii_case("thead"));
        let is_header = in_thead || (!cells.is_empty() && cells.iter().all(|c| c.is_header));

        let row = expand_row(&cells, &mut spans);
        total_cells = total_cells.saturating_add(row.len());

        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        grid.push((row, is_header));
    }

    if grid.is_empty() {
        return None;
    }

    let headers = match grid.first() {
        Some((_, true)) => Some(grid.remove(0).0),
        _ => None,
    };
    let rows = grid.into_iter().map(|(row, _)| row).collect();

    Some(Table { headers, rows, caption: caption(table) })
}

/// `<tr>` elements whose nearest enclosing table is this one.
fn own_rows<'a>(node: &NodeRef<'a>, table: &Selection<'a>) -> Vec<NodeRef<'a>> {
    table
        .select("tr")
        .nodes()
        .iter()
        .filter(|tr| dom::closest_ancestor(tr, "table").is_some_and(|t| dom::same_node(&t, node)))
        .copied()
        .collect()
}

fn row_cells(tr: &NodeRef) -> Vec<RawCell> {
    tr.children()
        .into_iter()
        .filter(NodeRef::is_element)
        .filter_map(|child| {
            let name = child.node_name()?.to_ascii_lowercase();
            if name != "td" && name != "th" {
                return None;
            }
            let cell = Selection::from(child);
            Some(RawCell {
                text: dom::normalized_text(&cell),
                colspan: parse_span(cell.attr("colspan").as_deref()),
                rowspan: parse_span(cell.attr("rowspan").as_deref()),
                is_header: name == "th",
            })
        })
        .collect()
}

/// Lay one row of cells onto the grid, filling slots still covered by a
/// `rowspan` from an earlier row.
fn expand_row(cells: &[RawCell], spans: &mut Vec<Option<(usize, String)>>) -> Vec<String> {
    let mut row: Vec<String> = Vec::new();
    let mut col: usize = 0;

    for cell in cells {
        push_spanned_cells(spans, &mut row, &mut col);

        let need_len = col.saturating_add(cell.colspan);
        if spans.len() < need_len {
            spans.resize_with(need_len, || None);
        }

        for i in 0..cell.colspan {
            row.push(cell.text.clone());
            if cell.rowspan > 1 {
                spans[col + i] = Some((cell.rowspan - 1, cell.text.clone()));
            }
        }
        col = need_len;
    }

    push_spanned_cells(spans, &mut row, &mut col);
    row
}

fn push_spanned_cells(spans: &mut [Option<(usize, String)>], row: &mut Vec<String>, col: &mut usize) {
    while *col < spans.len() {
        let Some((remaining, value)) = spans[*col].take() else {
            break;
        };
        row.push(value.clone());
        if remaining > 1 {
            spans[*col] = Some((remaining - 1, value));
        }
        *col += 1;
    }
}

fn parse_span(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .map_or(1, |n| n.min(MAX_SPAN))
}

fn caption(table: &Selection) -> Option<String> {
    table
        .children()
        .nodes()
        .iter()
        .find(|n| n.node_name().is_some_and(|name| name.eq_ignore_ascii_case("caption")))
        .map(|n| dom::normalized_text(&Selection::from(*n)))
        .filter(|c| !c.is_empty())
}
