//! Best-effort bulk import of a parsed CSV file into the `objects` collection.
//!
//! Rows are processed one at a time in file order. A row that cannot be written is recorded as
//! an error and the run moves on; rows written earlier are never rolled back. Only failures that
//! concern the store as a whole (permission denied, store unavailable) stop the run.

use crate::catalog::delimited::{parse_row, split_lines, SourceError};
use crate::store::{RecordStore, StoreError};
use common::jobs::FailureCategory;
use common::model::csv::Delimiter;
use common::model::field_config::ConfigurationDraft;
use common::model::import::{ImportOutcome, RowError, SkipReason};
use common::model::record::{FieldMap, ImportProvenance, NewRecord};
use common::model::user::ActingUser;
use log::{debug, info, warn};
use thiserror::Error;

/// Input of one import run.
pub struct ImportJob<'a> {
    pub source_text: &'a str,
    pub headers: &'a [String],
    pub delimiter: Delimiter,
    pub filterable_fields: &'a [String],
    pub searchable_fields: &'a [String],
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("You must be logged in to import data")]
    Unauthenticated,
    #[error("Only superadmin users can import CSV data")]
    Forbidden,
    #[error(transparent)]
    MalformedSource(#[from] SourceError),
    #[error("Import failed: {}", store_failure_message(.source))]
    Store { source: StoreError, imported: usize },
}

impl ImportError {
    pub fn category(&self) -> FailureCategory {
        match self {
            ImportError::Unauthenticated => FailureCategory::Unauthenticated,
            ImportError::Forbidden => FailureCategory::Forbidden,
            ImportError::MalformedSource(_) => FailureCategory::MalformedSource,
            ImportError::Store { source, .. } => match source {
                StoreError::PermissionDenied(_) => FailureCategory::PermissionDenied,
                StoreError::Unavailable(_) => FailureCategory::Unavailable,
                _ => FailureCategory::Unknown,
            },
        }
    }
}

fn store_failure_message(error: &StoreError) -> String {
    match error {
        StoreError::PermissionDenied(_) => {
            "You don't have permission to add objects to the database.".to_string()
        }
        StoreError::Unavailable(_) => {
            "Database is currently unavailable. Please try again later.".to_string()
        }
        other => other.to_string(),
    }
}

/// Only a logged-in superadmin may import.
pub fn authorize_import(user: &ActingUser) -> Result<(), ImportError> {
    if !user.is_authenticated() {
        return Err(ImportError::Unauthenticated);
    }
    if !user.role.is_superadmin() {
        return Err(ImportError::Forbidden);
    }
    Ok(())
}

/// A row is worth keeping when the first field whose name mentions "name", "no" or "title", or
/// the first field overall, has content.
pub fn has_meaningful_content(headers: &[String], fields: &FieldMap) -> bool {
    let filled = |header: Option<&String>| {
        header
            .and_then(|h| fields.get(h))
            .is_some_and(|v| !v.trim().is_empty())
    };
    let containing = |needle: &str| {
        headers
            .iter()
            .find(|h| h.to_lowercase().contains(needle))
    };
    filled(containing("name"))
        || filled(containing("no"))
        || filled(containing("title"))
        || filled(headers.first())
}

/// Imports every data line of `job.source_text`.
///
/// `progress` is called with the 1-based row number after each row has been handled. When at
/// least one record was created the field configuration is replaced by the one of this run.
pub fn run_import(
    store: &dyn RecordStore,
    job: &ImportJob<'_>,
    user: &ActingUser,
    progress: &mut dyn FnMut(usize),
) -> Result<ImportOutcome, ImportError> {
    authorize_import(user)?;

    let lines = split_lines(job.source_text);
    if lines.len() < 2 {
        return Err(SourceError::TooFewLines.into());
    }

    let headers = job.headers;
    info!(
        "Importing {} data rows, {} fields, delimiter '{}'",
        lines.len() - 1,
        headers.len(),
        job.delimiter.as_char()
    );
    for (kind, selected) in [
        ("filterable", job.filterable_fields),
        ("searchable", job.searchable_fields),
    ] {
        for field in selected.iter().filter(|f| !headers.contains(*f)) {
            warn!("{} field '{}' is not among the CSV headers", kind, field);
        }
    }

    let provenance = ImportProvenance {
        field_order: headers.to_vec(),
        filterable_fields: job.filterable_fields.to_vec(),
        searchable_fields: job.searchable_fields.to_vec(),
    };
    let mut outcome = ImportOutcome {
        total_rows: lines.len() - 1,
        ..Default::default()
    };

    for (row, line) in lines.iter().enumerate().skip(1) {
        let mut cells = parse_row(line, job.delimiter);
        cells.resize(headers.len(), String::new());

        if cells.iter().all(|cell| cell.trim().is_empty()) {
            debug!("Row {}: all fields empty", row);
            outcome.record_skip(SkipReason::Empty);
            progress(row);
            continue;
        }

        let fields: FieldMap = headers.iter().cloned().zip(cells).collect();
        if !has_meaningful_content(headers, &fields) {
            debug!("Row {}: no meaningful content", row);
            outcome.record_skip(SkipReason::NoMeaningfulContent);
            progress(row);
            continue;
        }

        let record = NewRecord {
            fields,
            created_by: Some(user.id.clone()),
            images: Vec::new(),
            provenance: Some(provenance.clone()),
        };
        match store.create_record(record) {
            Ok(_) => outcome.imported += 1,
            Err(source) if source.is_transport() => {
                warn!(
                    "Import aborted at row {} after {} imported: {}",
                    row, outcome.imported, source
                );
                return Err(ImportError::Store {
                    source,
                    imported: outcome.imported,
                });
            }
            Err(err) => {
                warn!("Import error for row {}: {}", row, err);
                outcome.errors.push(RowError {
                    row,
                    message: err.to_string(),
                });
            }
        }
        progress(row);
    }

    if outcome.imported > 0 {
        let draft = ConfigurationDraft {
            field_order: provenance.field_order,
            filterable_fields: provenance.filterable_fields,
            searchable_fields: provenance.searchable_fields,
            updated_by: user.id.clone(),
        };
        store
            .save_configuration(&draft)
            .map_err(|source| ImportError::Store {
                source,
                imported: outcome.imported,
            })?;
    }

    info!(
        "Import finished: {} imported, {} skipped ({} empty, {} without content), {} errors",
        outcome.imported,
        outcome.skipped(),
        outcome.skipped_empty,
        outcome.skipped_no_content,
        outcome.errors.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::delimited::SourceTable;
    use crate::catalog::fields::{reconcile_field_order, resolve_configuration};
    use crate::store::memory::MemoryStore;
    use common::model::import::ImportResultKind;
    use common::model::user::Role;

    fn superadmin() -> ActingUser {
        ActingUser {
            id: "admin".to_string(),
            role: Role::Superadmin,
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn import_text(
        store: &MemoryStore,
        text: &str,
        user: &ActingUser,
    ) -> Result<ImportOutcome, ImportError> {
        let table = SourceTable::parse(text.to_string()).unwrap();
        let filterable = strings(&["Type"]);
        let searchable: Vec<String> = Vec::new();
        let job = ImportJob {
            source_text: &table.source_text,
            headers: &table.headers,
            delimiter: table.delimiter,
            filterable_fields: &filterable,
            searchable_fields: &searchable,
        };
        run_import(store, &job, user, &mut |_| {})
    }

    #[test]
    fn empty_rows_are_skipped_and_numbered_rows_imported() {
        let store = MemoryStore::new();
        let outcome =
            import_text(&store, "No,Name,Type\n1,Statue A,Figure\n,,\n2,,Relief\n", &superadmin())
                .unwrap();

        assert_eq!(outcome.total_rows, 3);
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.skipped_empty, 1);
        assert!(outcome.errors.is_empty());

        let records = store.list_records().unwrap();
        assert_eq!(records[0].value("Name"), "Statue A");
        assert_eq!(records[1].value("No"), "2");
        assert_eq!(records[1].reserved.created_by.as_deref(), Some("admin"));
        assert_eq!(
            records[1].reserved.field_order,
            Some(strings(&["No", "Name", "Type"]))
        );
        assert_eq!(records[1].reserved.filterable_fields, Some(strings(&["Type"])));
    }

    #[test]
    fn rows_without_meaningful_content_are_skipped() {
        let store = MemoryStore::new();
        let outcome = import_text(&store, "Id,Name,Type\n,,Statue\n", &superadmin()).unwrap();
        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.skipped_no_content, 1);
        assert_eq!(outcome.kind(), ImportResultKind::AllSkipped);
        assert_eq!(store.create_attempts(), 0);
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_truncated() {
        let store = MemoryStore::new();
        let outcome = import_text(&store, "Name,Type,Dating\nRam\nIbis,Amulet,Late,extra,cells\n", &superadmin())
            .unwrap();
        assert_eq!(outcome.imported, 2);

        let records = store.list_records().unwrap();
        assert_eq!(records[0].value("Type"), "");
        assert_eq!(records[0].fields.len(), 3);
        assert_eq!(records[1].value("Dating"), "Late");
        assert_eq!(records[1].fields.len(), 3);
    }

    #[test]
    fn non_superadmins_cannot_import() {
        for role in [Role::None, Role::View, Role::Edit] {
            let store = MemoryStore::new();
            let user = ActingUser {
                id: "someone".to_string(),
                role,
            };
            let err = import_text(&store, "Name\nRam\n", &user).unwrap_err();
            assert!(matches!(err, ImportError::Forbidden));
            assert_eq!(store.create_attempts(), 0);
        }

        let store = MemoryStore::new();
        let err = import_text(&store, "Name\nRam\n", &ActingUser::anonymous()).unwrap_err();
        assert!(matches!(err, ImportError::Unauthenticated));
        assert_eq!(err.category(), FailureCategory::Unauthenticated);
    }

    #[test]
    fn row_failures_are_collected_without_stopping_the_run() {
        let store = MemoryStore::new();
        store.fail_create(2, StoreError::Rejected("document too large".to_string()));

        let outcome =
            import_text(&store, "Name\nRam\nIbis\nFalcon\n", &superadmin()).unwrap();
        assert_eq!(outcome.imported, 2);
        assert_eq!(
            outcome.errors,
            vec![RowError {
                row: 2,
                message: "write rejected: document too large".to_string()
            }]
        );
        assert_eq!(outcome.kind(), ImportResultKind::PartiallyImported);
        assert_eq!(store.list_records().unwrap().len(), 2);
    }

    #[test]
    fn transport_failures_abort_but_keep_earlier_rows() {
        let store = MemoryStore::new();
        store.fail_create(2, StoreError::PermissionDenied("rules".to_string()));

        let err = import_text(&store, "Name\nRam\nIbis\nFalcon\n", &superadmin()).unwrap_err();
        assert!(matches!(err, ImportError::Store { imported: 1, .. }));
        assert_eq!(err.category(), FailureCategory::PermissionDenied);
        assert_eq!(
            err.to_string(),
            "Import failed: You don't have permission to add objects to the database."
        );
        assert_eq!(store.create_attempts(), 2);
        assert_eq!(store.list_records().unwrap().len(), 1);
    }

    #[test]
    fn header_only_sources_are_rejected_before_writing() {
        let store = MemoryStore::new();
        let headers = strings(&["Name"]);
        let job = ImportJob {
            source_text: "Name\n\n",
            headers: &headers,
            delimiter: Delimiter::Comma,
            filterable_fields: &[],
            searchable_fields: &[],
        };
        let err = run_import(&store, &job, &superadmin(), &mut |_| {}).unwrap_err();
        assert!(matches!(
            err,
            ImportError::MalformedSource(SourceError::TooFewLines)
        ));
    }

    #[test]
    fn latest_import_defines_the_field_order() {
        let store = MemoryStore::new();
        import_text(&store, "No,Name\n1,Ram\n", &superadmin()).unwrap();
        import_text(&store, "Title;Dating;Type\nBook;Late;Papyrus\n", &superadmin()).unwrap();

        let stored = store.load_configuration().unwrap();
        assert_eq!(stored.as_ref().map(|c| c.version), Some(2));
        let records = store.list_records().unwrap();
        let config = resolve_configuration(stored.as_ref(), &records);
        assert_eq!(
            reconcile_field_order(None, config.as_ref(), &records),
            strings(&["Title", "Dating", "Type"])
        );
    }

    #[test]
    fn all_skipped_runs_leave_the_configuration_alone() {
        let store = MemoryStore::new();
        import_text(&store, "Name\n   \n", &superadmin()).unwrap();
        assert_eq!(store.load_configuration().unwrap(), None);
    }

    #[test]
    fn progress_reports_every_row() {
        let store = MemoryStore::new();
        let headers = strings(&["Name"]);
        let job = ImportJob {
            source_text: "Name\nRam\n,\nIbis",
            headers: &headers,
            delimiter: Delimiter::Comma,
            filterable_fields: &[],
            searchable_fields: &[],
        };
        let mut seen = Vec::new();
        run_import(&store, &job, &superadmin(), &mut |row| seen.push(row)).unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
