//! In-memory stores for tests, with failure injection.

use crate::store::blob::{BlobError, BlobStore};
use crate::store::{RecordStore, StoreError, UserDirectory};
use common::model::field_config::{ConfigurationDraft, FieldConfiguration};
use common::model::record::{NewRecord, Record, RecordPatch, ReservedAttributes};
use common::model::user::{Role, User};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
    configuration: Mutex<Option<FieldConfiguration>>,
    users: Mutex<Vec<User>>,
    /// Failures keyed by the 1-based ordinal of the `create_record` call they replace.
    create_failures: Mutex<HashMap<usize, StoreError>>,
    create_attempts: Mutex<usize>,
    next_id: Mutex<usize>,
    /// Run once, after the next `list_records` has read the records.
    after_list: Mutex<Option<Hook>>,
    /// Run once, after the next `load_configuration` has read the configuration.
    after_configuration_load: Mutex<Option<Hook>>,
}

type Hook = Box<dyn FnOnce() + Send>;

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Makes the `attempt`-th call to `create_record` fail with `error`.
    pub fn fail_create(&self, attempt: usize, error: StoreError) {
        self.create_failures.lock().unwrap().insert(attempt, error);
    }

    pub fn create_attempts(&self) -> usize {
        *self.create_attempts.lock().unwrap()
    }

    pub fn after_next_list(&self, hook: impl FnOnce() + Send + 'static) {
        *self.after_list.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn after_next_configuration_load(&self, hook: impl FnOnce() + Send + 'static) {
        *self.after_configuration_load.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn with_user(self, id: &str, role: Role) -> Self {
        self.users.lock().unwrap().push(User {
            id: id.to_string(),
            email: format!("{}@example.org", id),
            display_name: id.to_string(),
            role,
        });
        self
    }
}

impl RecordStore for MemoryStore {
    fn create_record(&self, record: NewRecord) -> Result<String, StoreError> {
        let attempt = {
            let mut attempts = self.create_attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if let Some(error) = self.create_failures.lock().unwrap().remove(&attempt) {
            return Err(error);
        }

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("obj-{}", *next)
        };
        let provenance = record.provenance;
        self.records.lock().unwrap().push(Record {
            id: id.clone(),
            fields: record.fields,
            reserved: ReservedAttributes {
                created_at: Some("2026-01-01T00:00:00+00:00".to_string()),
                created_by: record.created_by,
                images: record.images,
                field_order: provenance.as_ref().map(|p| p.field_order.clone()),
                filterable_fields: provenance.as_ref().map(|p| p.filterable_fields.clone()),
                searchable_fields: provenance.as_ref().map(|p| p.searchable_fields.clone()),
            },
        });
        Ok(id)
    }

    fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    fn list_records(&self) -> Result<Vec<Record>, StoreError> {
        let records = self.records.lock().unwrap().clone();
        let hook = self.after_list.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(records)
    }

    fn update_record(&self, id: &str, patch: &RecordPatch) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("object {}", id)))?;
        if let Some(fields) = &patch.fields {
            for (name, value) in fields {
                record.fields.insert(name.clone(), value.clone());
            }
        }
        if let Some(images) = &patch.images {
            record.reserved.images = images.clone();
        }
        Ok(())
    }

    fn delete_record(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(format!("object {}", id)));
        }
        Ok(())
    }

    fn load_configuration(&self) -> Result<Option<FieldConfiguration>, StoreError> {
        let configuration = self.configuration.lock().unwrap().clone();
        let hook = self.after_configuration_load.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(configuration)
    }

    fn save_configuration(
        &self,
        draft: &ConfigurationDraft,
    ) -> Result<FieldConfiguration, StoreError> {
        let mut current = self.configuration.lock().unwrap();
        let version = current.as_ref().map(|c| c.version).unwrap_or(0) + 1;
        let saved = FieldConfiguration {
            version,
            field_order: draft.field_order.clone(),
            filterable_fields: draft.filterable_fields.clone(),
            searchable_fields: draft.searchable_fields.clone(),
            updated_by: Some(draft.updated_by.clone()),
            updated_at: Some("2026-01-01T00:00:00+00:00".to_string()),
        };
        *current = Some(saved.clone());
        Ok(saved)
    }
}

impl UserDirectory for MemoryStore {
    fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    fn ensure_user(
        &self,
        id: &str,
        email: &str,
        display_name: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter().find(|u| u.id == id) {
            return Ok(user.clone());
        }
        let user = User {
            id: id.to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
            role: Role::None,
        };
        users.push(user.clone());
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().unwrap().clone())
    }

    fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.role = role;
        Ok(())
    }
}

/// Blob store that keeps bytes in a map and can refuse deletions.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_deletes: bool,
}

impl MemoryBlobStore {
    pub fn failing_deletes() -> Self {
        MemoryBlobStore {
            fail_deletes: true,
            ..Default::default()
        }
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(reference)
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        Ok(path.to_string())
    }

    fn resolve(&self, reference: &str) -> Result<String, BlobError> {
        Ok(format!("/api/images/{}", reference))
    }

    fn read(&self, reference: &str) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(reference.to_string()))
    }

    fn delete(&self, reference: &str) -> Result<(), BlobError> {
        if self.fail_deletes {
            return Err(BlobError::Io(std::io::Error::other("blob store offline")));
        }
        self.blobs
            .lock()
            .unwrap()
            .remove(reference)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(reference.to_string()))
    }
}
