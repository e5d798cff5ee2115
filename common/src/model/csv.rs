use serde::{Deserialize, Serialize};

/// Cell separator of an uploaded file.
///
/// Only import is delimiter-adaptive; exports are always comma separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
        }
    }
}

/// Returned when an operator selects a file for import.
///
/// The backend parses the upload, keeps it in an import session and sends back this summary so
/// the operator can review the detected headers and pick the filterable and searchable fields
/// before starting the import proper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreview {
    /// Identifier of the import session holding the parsed file.
    pub session_id: String,
    /// Trimmed header names, in file order.
    pub headers: Vec<String>,
    /// The first few data rows, as parsed (not padded).
    pub preview_rows: Vec<Vec<String>>,
    /// Number of data rows in the file.
    pub total_rows: usize,
    pub delimiter: Delimiter,
    /// Field order currently in effect for the collection. Headers missing from this list are
    /// new fields.
    pub known_fields: Vec<String>,
}
