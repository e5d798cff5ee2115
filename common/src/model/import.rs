use serde::{Deserialize, Serialize};
use std::fmt;

/// How many errors the end-of-run message quotes verbatim.
const QUOTED_ERRORS: usize = 3;

/// Why a data row was left out of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Every cell was blank after trimming.
    Empty,
    /// No name, number, title or first-column value.
    NoMeaningfulContent,
}

/// A data row whose write was rejected by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based data row number (the header is row 0).
    pub row: usize,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// Counters and errors gathered by one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped_empty: usize,
    pub skipped_no_content: usize,
    pub errors: Vec<RowError>,
}

impl ImportOutcome {
    pub fn skipped(&self) -> usize {
        self.skipped_empty + self.skipped_no_content
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Empty => self.skipped_empty += 1,
            SkipReason::NoMeaningfulContent => self.skipped_no_content += 1,
        }
    }

    pub fn kind(&self) -> ImportResultKind {
        match (self.imported, self.errors.is_empty()) {
            (0, false) => ImportResultKind::AllFailed,
            (_, false) => ImportResultKind::PartiallyImported,
            (0, true) => ImportResultKind::AllSkipped,
            _ => ImportResultKind::Imported,
        }
    }

    /// The single end-of-run message shown to the operator.
    pub fn message(&self) -> String {
        match self.kind() {
            ImportResultKind::Imported if self.skipped() > 0 => format!(
                "CSV import complete: {} objects imported, {} rows skipped",
                self.imported,
                self.skipped()
            ),
            ImportResultKind::Imported => {
                format!("CSV import complete: {} objects imported", self.imported)
            }
            ImportResultKind::PartiallyImported => format!(
                "Import completed with errors. Imported: {}, Skipped: {}, Errors: {}. First few errors: {}",
                self.imported,
                self.skipped(),
                self.errors.len(),
                self.quoted_errors()
            ),
            ImportResultKind::AllSkipped => format!(
                "No objects were imported. {} rows were skipped (empty or invalid data).",
                self.skipped()
            ),
            ImportResultKind::AllFailed => format!(
                "No objects were imported. All {} attempted rows failed. First few errors: {}",
                self.errors.len(),
                self.quoted_errors()
            ),
        }
    }

    pub fn into_report(self) -> ImportReport {
        ImportReport {
            kind: self.kind(),
            message: self.message(),
            outcome: self,
        }
    }

    fn quoted_errors(&self) -> String {
        self.errors
            .iter()
            .take(QUOTED_ERRORS)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Classification of a finished import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportResultKind {
    Imported,
    PartiallyImported,
    AllSkipped,
    AllFailed,
}

/// Final payload of a completed import job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub kind: ImportResultKind,
    pub message: String,
    pub outcome: ImportOutcome,
}
