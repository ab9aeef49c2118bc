//! Result serialization: CSV rows or JSON lines.
//!
//! The CSV schema is `Title,Content,Accessible,Type` with `YES`/`NO`
//! accessibility flags; inaccessible rows carry their reason in the
//! `Content` column so the output stays a single self-describing table.

use std::io::{self, Write};

use crate::harvest::HarvestResult;

/// Writes results as CSV with a header row.
///
/// # Errors
///
/// Returns any I/O error from the underlying writer.
pub fn write_results_csv<W: Write>(writer: &mut W, results: &[HarvestResult]) -> io::Result<()> {
    writeln!(writer, "Title,Content,Accessible,Type")?;
    for result in results {
        let content = if result.accessible {
            result.content.as_str()
        } else {
            result.reason.as_deref().unwrap_or("")
        };
        writeln!(
            writer,
            "{},{},{},{}",
            csv_field(&result.title),
            csv_field(content),
            if result.accessible { "YES" } else { "NO" },
            result.content_type
        )?;
    }
    writer.flush()
}

/// Writes results as newline-delimited JSON objects.
///
/// # Errors
///
/// Returns any I/O error from the underlying writer; serialization of a
/// result row cannot fail.
pub fn write_results_json<W: Write>(writer: &mut W, results: &[HarvestResult]) -> io::Result<()> {
    for result in results {
        let line = serde_json::to_string(result).map_err(io::Error::other)?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
