//! Serialization of results for storage and hand-off.
//!
//! JSON is the canonical form; CSV covers tables and a per-result summary.

use std::fmt::Write as _;
use std::io::Write;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::result::{ExtractionResult, Table};

/// Pretty-printed JSON of any result shape.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// One compact JSON document per line.
pub fn to_json_lines(results: &[ExtractionResult]) -> Result<String> {
    let mut out = String::new();
    for result in results {
        out.push_str(&serde_json::to_string(result)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write results as JSON lines to `writer`.
pub fn write_json_lines<W: Write>(mut writer: W, results: &[ExtractionResult]) -> Result<()> {
    for result in results {
        serde_json::to_writer(&mut writer, result)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// A table as CSV. The header row comes first when present.
///
/// Rows shorter than the table width are padded with empty fields so every
/// record has the same field count.
pub fn table_to_csv(table: &Table) -> Result<String> {
    let width = table.width();
    if width == 0 {
        return Err(Error::Export("table has no columns".into()));
    }

    let mut out = String::new();
    if let Some(ref headers) = table.headers {
        push_record(&mut out, headers, width);
    }
    for row in &table.rows {
        push_record(&mut out, row, width);
    }
    Ok(out)
}

/// One summary line per result: URL, status, title, word count.
#[must_use]
pub fn results_summary_csv(results: &[ExtractionResult]) -> String {
    let mut out = String::from("url,status,title,word_count\r\n");
    for result in results {
        let status = serde_json::to_value(result.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let words = result
            .data
            .as_ref()
            .and_then(|d| d.article.as_ref().map(|a| a.word_count).or_else(|| {
                d.text.as_ref().map(|t| t.split_whitespace().count())
            }))
            .unwrap_or(0);

        let fields = [
            result.url.clone(),
            status,
            result.title().unwrap_or_default().to_string(),
            words.to_string(),
        ];
        push_record(&mut out, &fields, fields.len());
    }
    out
}

fn push_record(out: &mut String, fields: &[String], width: usize) {
    for i in 0..width {
        if i > 0 {
            out.push(',');
        }
        let field = fields.get(i).map_or("", String::as_str);
        push_field(out, field);
    }
    out.push_str("\r\n");
}

/// RFC 4180 quoting: fields containing a comma, quote or line break are
/// wrapped in quotes with inner quotes doubled.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        let _ = write!(out, "\"{}\"", field.replace('"', "\"\""));
    } else {
        out.push_str(field);
    }
}
