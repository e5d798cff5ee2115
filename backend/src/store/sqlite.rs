//! SQLite-backed implementation of `RecordStore` and `UserDirectory`.
//!
//! Records are stored as documents: the operator fields live in a JSON object column so that any
//! set of field names is accepted without schema changes. A connection is opened per operation,
//! which keeps the store `Send + Sync` without a pool and lets several import jobs and request
//! handlers share the same file.

use crate::store::{RecordStore, StoreError, UserDirectory};
use chrono::Utc;
use common::model::field_config::{ConfigurationDraft, FieldConfiguration};
use common::model::record::{FieldMap, NewRecord, Record, RecordPatch, ReservedAttributes};
use common::model::user::{Role, User};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS objects (
    id TEXT PRIMARY KEY,
    fields TEXT NOT NULL,
    images TEXT NOT NULL DEFAULT '[]',
    field_order TEXT,
    filterable_fields TEXT,
    searchable_fields TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS field_configuration (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    field_order TEXT NOT NULL,
    filterable_fields TEXT NOT NULL,
    searchable_fields TEXT NOT NULL,
    updated_by TEXT,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL DEFAULT '',
    display_name TEXT NOT NULL DEFAULT '',
    role TEXT NOT NULL DEFAULT ''
);
";

const RECORD_COLUMNS: &str = "id, fields, images, field_order, filterable_fields, \
     searchable_fields, created_by, created_at";

pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and makes sure the tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = SqliteStore {
            path: path.as_ref().to_path_buf(),
        };
        store.connect()?.execute_batch(SCHEMA)?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        match err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::FileLockingProtocolFailed,
            ) => StoreError::Unavailable(message),
            Some(
                ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::AuthorizationForStatementDenied,
            ) => StoreError::PermissionDenied(message),
            Some(ErrorCode::ConstraintViolation | ErrorCode::TooBig | ErrorCode::TypeMismatch) => {
                StoreError::Rejected(message)
            }
            _ => match err {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(message),
                rusqlite::Error::ToSqlConversionFailure(_) => StoreError::Rejected(message),
                _ => StoreError::Unknown(message),
            },
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Rejected(e.to_string()))
}

fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::Unknown(format!("corrupt {} column: {}", column, e)))
}

fn optional_json(column: &str, raw: Option<String>) -> Result<Option<Vec<String>>, StoreError> {
    raw.map(|raw| from_json(column, &raw)).transpose()
}

/// Raw column values of one `objects` row, decoded outside of the rusqlite closure so that JSON
/// errors surface as `StoreError`s.
struct RecordRow {
    id: String,
    fields: String,
    images: String,
    field_order: Option<String>,
    filterable_fields: Option<String>,
    searchable_fields: Option<String>,
    created_by: Option<String>,
    created_at: String,
}

impl RecordRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RecordRow {
            id: row.get(0)?,
            fields: row.get(1)?,
            images: row.get(2)?,
            field_order: row.get(3)?,
            filterable_fields: row.get(4)?,
            searchable_fields: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn decode(self) -> Result<Record, StoreError> {
        Ok(Record {
            id: self.id,
            fields: from_json("fields", &self.fields)?,
            reserved: ReservedAttributes {
                created_at: Some(self.created_at),
                created_by: self.created_by,
                images: from_json("images", &self.images)?,
                field_order: optional_json("field_order", self.field_order)?,
                filterable_fields: optional_json("filterable_fields", self.filterable_fields)?,
                searchable_fields: optional_json("searchable_fields", self.searchable_fields)?,
            },
        })
    }
}

fn read_configuration(conn: &Connection) -> Result<Option<FieldConfiguration>, StoreError> {
    let row = conn
        .query_row(
            "SELECT version, field_order, filterable_fields, searchable_fields, updated_by, updated_at
             FROM field_configuration WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    row.map(
        |(version, field_order, filterable, searchable, updated_by, updated_at)| {
            Ok(FieldConfiguration {
                version: version.max(0) as u64,
                field_order: from_json("field_order", &field_order)?,
                filterable_fields: from_json("filterable_fields", &filterable)?,
                searchable_fields: from_json("searchable_fields", &searchable)?,
                updated_by,
                updated_at: Some(updated_at),
            })
        },
    )
    .transpose()
}

impl RecordStore for SqliteStore {
    fn create_record(&self, record: NewRecord) -> Result<String, StoreError> {
        let conn = self.connect()?;
        let id = Uuid::new_v4().simple().to_string();
        let provenance = record.provenance.as_ref();
        let field_order = provenance.map(|p| to_json(&p.field_order)).transpose()?;
        let filterable = provenance
            .map(|p| to_json(&p.filterable_fields))
            .transpose()?;
        let searchable = provenance
            .map(|p| to_json(&p.searchable_fields))
            .transpose()?;

        conn.execute(
            "INSERT INTO objects (id, fields, images, field_order, filterable_fields,
                                  searchable_fields, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                to_json(&record.fields)?,
                to_json(&record.images)?,
                field_order,
                filterable,
                searchable,
                record.created_by,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError> {
        let conn = self.connect()?;
        let sql = format!("SELECT {} FROM objects WHERE id = ?1", RECORD_COLUMNS);
        conn.query_row(&sql, params![id], RecordRow::read)
            .optional()?
            .map(RecordRow::decode)
            .transpose()
    }

    fn list_records(&self) -> Result<Vec<Record>, StoreError> {
        let conn = self.connect()?;
        let sql = format!("SELECT {} FROM objects ORDER BY rowid", RECORD_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], RecordRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RecordRow::decode).collect()
    }

    fn update_record(&self, id: &str, patch: &RecordPatch) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT fields FROM objects WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(existing) = existing else {
            return Err(StoreError::NotFound(format!("object {}", id)));
        };

        if let Some(changes) = &patch.fields {
            let mut fields: FieldMap = from_json("fields", &existing)?;
            for (name, value) in changes {
                fields.insert(name.clone(), value.clone());
            }
            tx.execute(
                "UPDATE objects SET fields = ?1 WHERE id = ?2",
                params![to_json(&fields)?, id],
            )?;
        }
        if let Some(images) = &patch.images {
            tx.execute(
                "UPDATE objects SET images = ?1 WHERE id = ?2",
                params![to_json(images)?, id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_record(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let deleted = conn.execute("DELETE FROM objects WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("object {}", id)));
        }
        Ok(())
    }

    fn load_configuration(&self) -> Result<Option<FieldConfiguration>, StoreError> {
        read_configuration(&self.connect()?)
    }

    fn save_configuration(
        &self,
        draft: &ConfigurationDraft,
    ) -> Result<FieldConfiguration, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO field_configuration
                 (id, version, field_order, filterable_fields, searchable_fields, updated_by, updated_at)
             VALUES (1, 1, ?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 version = version + 1,
                 field_order = excluded.field_order,
                 filterable_fields = excluded.filterable_fields,
                 searchable_fields = excluded.searchable_fields,
                 updated_by = excluded.updated_by,
                 updated_at = excluded.updated_at",
            params![
                to_json(&draft.field_order)?,
                to_json(&draft.filterable_fields)?,
                to_json(&draft.searchable_fields)?,
                draft.updated_by,
                Utc::now().to_rfc3339(),
            ],
        )?;
        read_configuration(&conn)?
            .ok_or_else(|| StoreError::Unknown("configuration vanished after write".to_string()))
    }
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        role: Role::parse(&row.get::<_, String>(3)?),
    })
}

impl UserDirectory for SqliteStore {
    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.connect()?;
        Ok(conn
            .query_row(
                "SELECT id, email, display_name, role FROM users WHERE id = ?1",
                params![id],
                read_user,
            )
            .optional()?)
    }

    fn ensure_user(
        &self,
        id: &str,
        email: &str,
        display_name: &str,
    ) -> Result<User, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (id, email, display_name, role) VALUES (?1, ?2, ?3, '')",
            params![id, email, display_name],
        )?;
        Ok(conn.query_row(
            "SELECT id, email, display_name, role FROM users WHERE id = ?1",
            params![id],
            read_user,
        )?)
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT id, email, display_name, role FROM users ORDER BY rowid")?;
        let users = stmt
            .query_map([], read_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let updated = conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::record::ImportProvenance;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("catalog.sqlite")).unwrap();
        (dir, store)
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn created_records_keep_field_order_and_provenance() {
        let (_dir, store) = store();
        let id = store
            .create_record(NewRecord {
                fields: fields(&[("Zeta", "1"), ("Alpha", "2")]),
                created_by: Some("u1".to_string()),
                images: vec![],
                provenance: Some(ImportProvenance {
                    field_order: vec!["Zeta".to_string(), "Alpha".to_string()],
                    filterable_fields: vec!["Alpha".to_string()],
                    searchable_fields: vec![],
                }),
            })
            .unwrap();

        let record = store.get_record(&id).unwrap().unwrap();
        let names: Vec<_> = record.fields.keys().cloned().collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert_eq!(record.reserved.created_by.as_deref(), Some("u1"));
        assert!(record.reserved.created_at.is_some());
        assert_eq!(
            record.reserved.filterable_fields,
            Some(vec!["Alpha".to_string()])
        );
        assert_eq!(store.list_records().unwrap().len(), 1);
    }

    #[test]
    fn update_merges_fields_and_replaces_images() {
        let (_dir, store) = store();
        let id = store
            .create_record(NewRecord {
                fields: fields(&[("Name", "Ram"), ("Type", "Statue")]),
                ..Default::default()
            })
            .unwrap();

        store
            .update_record(
                &id,
                &RecordPatch {
                    fields: Some(fields(&[("Type", "Relief"), ("Dating", "Late")])),
                    images: Some(vec!["object-images/1-a.jpg".to_string()]),
                },
            )
            .unwrap();

        let record = store.get_record(&id).unwrap().unwrap();
        assert_eq!(record.value("Name"), "Ram");
        assert_eq!(record.value("Type"), "Relief");
        assert_eq!(record.value("Dating"), "Late");
        assert_eq!(record.reserved.images.len(), 1);
    }

    #[test]
    fn missing_records_report_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.delete_record("nope"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_record("nope", &RecordPatch::default()),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.get_record("nope").unwrap(), None);
    }

    #[test]
    fn configuration_versions_increase_on_every_save() {
        let (_dir, store) = store();
        assert_eq!(store.load_configuration().unwrap(), None);

        let mut draft = ConfigurationDraft {
            field_order: vec!["A".to_string()],
            filterable_fields: vec![],
            searchable_fields: vec!["A".to_string()],
            updated_by: "admin".to_string(),
        };
        assert_eq!(store.save_configuration(&draft).unwrap().version, 1);

        draft.field_order = vec!["B".to_string(), "C".to_string()];
        let saved = store.save_configuration(&draft).unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(saved.field_order, vec!["B", "C"]);
        assert_eq!(store.load_configuration().unwrap(), Some(saved));
    }

    #[test]
    fn users_register_without_access() {
        let (_dir, store) = store();
        let user = store.ensure_user("u1", "u1@example.org", "U One").unwrap();
        assert_eq!(user.role, Role::None);

        store.set_role("u1", Role::Edit).unwrap();
        let again = store.ensure_user("u1", "other@example.org", "").unwrap();
        assert_eq!(again.role, Role::Edit);
        assert_eq!(again.email, "u1@example.org");
        assert!(matches!(
            store.set_role("ghost", Role::View),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn sqlite_codes_map_to_store_categories() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(StoreError::from(busy), StoreError::Unavailable(_)));

        let readonly = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_READONLY),
            None,
        );
        assert!(matches!(
            StoreError::from(readonly),
            StoreError::PermissionDenied(_)
        ));

        let constraint = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(!StoreError::from(constraint).is_transport());
    }
}
