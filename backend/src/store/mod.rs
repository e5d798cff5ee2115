//! Collaborators the catalog persists through.
//!
//! - `RecordStore`: the `objects` collection plus the field configuration record.
//! - `UserDirectory`: users and their roles, as handed over by the identity provider.
//! - `BlobStore` (in `blob`): image binaries.
//!
//! `sqlite::SqliteStore` implements the first two on top of a local SQLite file. The catalog
//! only ever talks to the traits, so any document store with the same semantics can stand in.

pub mod blob;
#[cfg(test)]
pub mod memory;
pub mod sqlite;

use common::model::field_config::{ConfigurationDraft, FieldConfiguration};
use common::model::record::{NewRecord, Record, RecordPatch};
use common::model::user::{Role, User};
use thiserror::Error;

/// Failure reported by a store.
///
/// `PermissionDenied` and `Unavailable` describe the store as a whole; the other variants are
/// about the single operation that was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("{0}")]
    Unknown(String),
}

impl StoreError {
    /// True for failures that make every further write pointless.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::PermissionDenied(_) | StoreError::Unavailable(_)
        )
    }
}

/// The `objects` collection and its configuration record.
pub trait RecordStore: Send + Sync {
    /// Persists a new record and returns the identifier the store assigned to it.
    fn create_record(&self, record: NewRecord) -> Result<String, StoreError>;

    fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError>;

    /// Every record, in creation order.
    fn list_records(&self) -> Result<Vec<Record>, StoreError>;

    fn update_record(&self, id: &str, patch: &RecordPatch) -> Result<(), StoreError>;

    fn delete_record(&self, id: &str) -> Result<(), StoreError>;

    fn load_configuration(&self) -> Result<Option<FieldConfiguration>, StoreError>;

    /// Replaces the configuration record, bumping its version, and returns what was stored.
    fn save_configuration(
        &self,
        draft: &ConfigurationDraft,
    ) -> Result<FieldConfiguration, StoreError>;
}

/// Users as seen by the identity collaborator.
pub trait UserDirectory: Send + Sync {
    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Registers `id` with no access unless it is already known. Returns the stored user.
    fn ensure_user(&self, id: &str, email: &str, display_name: &str)
        -> Result<User, StoreError>;

    fn list_users(&self) -> Result<Vec<User>, StoreError>;

    fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError>;
}
