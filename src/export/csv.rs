//! Export the joined dataset to CSV.
//!
//! Columns: `filename`, `email`, `expected_output`. The expected output is the
//! order record as compact JSON, or an empty cell when the message did not
//! match any record.

use std::io::Write;
use std::path::Path;

use crate::model::mail::DatasetRow;

/// CSV formatting options.
#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    /// Field separator.
    pub separator: char,
    /// Prefix the file with a UTF-8 BOM (for Excel).
    pub bom: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            bom: false,
        }
    }
}

/// Write dataset rows as CSV to any writer.
pub fn write_csv<W: Write>(
    out: &mut W,
    rows: &[DatasetRow],
    options: &CsvOptions,
) -> anyhow::Result<()> {
    if options.bom {
        out.write_all(&[0xEF, 0xBB, 0xBF])?;
    }

    let sep = options.separator;
    writeln!(out, "filename{sep}email{sep}expected_output")?;

    for row in rows {
        let expected = match &row.expected_output {
            Some(record) => serde_json::to_string(record)?,
            None => String::new(),
        };
        writeln!(
            out,
            "{}{sep}{}{sep}{}",
            csv_escape(row.filename.as_deref().unwrap_or(""), sep),
            csv_escape(&row.email, sep),
            csv_escape(&expected, sep),
        )?;
    }

    Ok(())
}

/// Export dataset rows to a CSV file, creating parent directories.
pub fn export_dataset(
    rows: &[DatasetRow],
    output_path: &Path,
    options: &CsvOptions,
) -> anyhow::Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(output_path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_csv(&mut writer, rows, options)?;
    writer.flush()?;
    tracing::info!(path = %output_path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains the separator, quotes, or newlines.
fn csv_escape(value: &str, separator: char) -> String {
    if value.contains(separator)
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
