//! CSV export of the record collection.
//!
//! Output is always comma separated, whatever delimiter the data was imported with. Every data
//! cell is quoted; header cells only when they need it.

use common::model::record::Record;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("No objects to export")]
    NothingToExport,
    #[error("CSV serialization failed: {0}")]
    Serialize(String),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Serialize(err.to_string())
    }
}

fn writer(style: QuoteStyle) -> csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .quote_style(style)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Serialize(e.to_string()))
}

/// Serializes `records` with one column per entry of `field_order`. Fields a record does not
/// carry are exported as empty cells. Lines are joined with `\n`, without a trailing newline.
pub fn export_records(records: &[Record], field_order: &[String]) -> Result<String, ExportError> {
    if field_order.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut header = writer(QuoteStyle::Necessary);
    header.write_record(field_order)?;

    let mut rows = writer(QuoteStyle::Always);
    for record in records {
        rows.write_record(field_order.iter().map(|field| record.value(field)))?;
    }

    let mut bytes = finish(header)?;
    bytes.extend(finish(rows)?);
    let mut text = String::from_utf8(bytes).map_err(|e| ExportError::Serialize(e.to_string()))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}
