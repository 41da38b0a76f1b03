//! Export order records and dataset items as JSON.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::model::mail::{DatasetItem, ParsedMessage};
use crate::model::order::OrderRecord;

fn write_json<T: Serialize + ?Sized>(
    value: &T,
    output_path: &Path,
    pretty: bool,
) -> anyhow::Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(output_path)?;
    let mut writer = std::io::BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write parsed transcript records as a JSON array, in transcript order.
pub fn write_records(
    records: &[OrderRecord],
    output_path: &Path,
    pretty: bool,
) -> anyhow::Result<()> {
    write_json(records, output_path, pretty)?;
    tracing::info!(path = %output_path.display(), records = records.len(), "Wrote records");
    Ok(())
}

/// Write joined messages as dataset items (`input` + `expected_output`).
pub fn write_dataset(
    messages: &[ParsedMessage],
    output_path: &Path,
    pretty: bool,
) -> anyhow::Result<()> {
    let items: Vec<DatasetItem> = messages.iter().map(DatasetItem::from).collect();
    write_json(&items, output_path, pretty)?;
    tracing::info!(path = %output_path.display(), items = items.len(), "Wrote dataset");
    Ok(())
}

/// Load dataset items written by [`write_dataset`].
pub fn read_dataset(path: &Path) -> crate::error::Result<Vec<DatasetItem>> {
    let text = crate::input::read_corpus(path)?;
    Ok(serde_json::from_str(&text)?)
}
