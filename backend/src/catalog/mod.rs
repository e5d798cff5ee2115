//! The object catalog: CSV import and export, field reconciliation and record maintenance.
//!
//! `Catalog` is the entry point the HTTP services use. It owns the collaborators (record store,
//! user directory, blob store), the change feed that every write is announced on and the cached
//! field configuration. Read paths go through a `view::LiveView` attached to the feed.

pub mod delimited;
pub mod export;
pub mod feed;
pub mod fields;
pub mod import;
pub mod session;
pub mod view;

use crate::catalog::feed::{ChangeEvent, ChangeFeed, Subscription};
use crate::catalog::import::{has_meaningful_content, run_import, ImportError, ImportJob};
use crate::catalog::view::LiveView;
use crate::store::blob::{image_path, BlobError, BlobStore};
use crate::store::{RecordStore, StoreError, UserDirectory};
use common::model::field_config::FieldConfiguration;
use common::model::import::ImportOutcome;
use common::model::record::{FieldMap, NewRecord, ObjectDetail, Record, RecordPatch};
use common::model::user::ActingUser;
use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Images a record may carry.
pub const MAX_IMAGES: usize = 3;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("You must be logged in")]
    Unauthenticated,
    #[error("Your role does not allow this action")]
    Forbidden,
    #[error("Object {0} not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("An object can have at most {MAX_IMAGES} images")]
    TooManyImages,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blob(#[from] BlobError),
}

pub fn require_view(user: &ActingUser) -> Result<(), CatalogError> {
    if !user.is_authenticated() {
        return Err(CatalogError::Unauthenticated);
    }
    if !user.role.can_view() {
        return Err(CatalogError::Forbidden);
    }
    Ok(())
}

pub fn require_edit(user: &ActingUser) -> Result<(), CatalogError> {
    if !user.is_authenticated() {
        return Err(CatalogError::Unauthenticated);
    }
    if !user.role.can_edit() {
        return Err(CatalogError::Forbidden);
    }
    Ok(())
}

pub fn require_superadmin(user: &ActingUser) -> Result<(), CatalogError> {
    if !user.is_authenticated() {
        return Err(CatalogError::Unauthenticated);
    }
    if !user.role.is_superadmin() {
        return Err(CatalogError::Forbidden);
    }
    Ok(())
}

/// The stored configuration record, read once and kept until invalidated.
///
/// A load only lands in the cache if no invalidation happened while it was reading.
#[derive(Default)]
pub struct ConfigCache {
    cached: RwLock<Option<Option<FieldConfiguration>>>,
    generation: AtomicU64,
}

impl ConfigCache {
    pub fn get(&self, store: &dyn RecordStore) -> Result<Option<FieldConfiguration>, StoreError> {
        if let Some(cached) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Ok(cached);
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let loaded = store.load_configuration()?;
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) == generation {
            *cached = Some(loaded.clone());
        }
        Ok(loaded)
    }

    pub fn invalidate(&self) {
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *cached = None;
    }
}

fn trimmed(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

#[derive(Clone)]
pub struct Catalog {
    records: Arc<dyn RecordStore>,
    users: Arc<dyn UserDirectory>,
    blobs: Arc<dyn BlobStore>,
    feed: ChangeFeed,
    config: Arc<ConfigCache>,
    _config_watch: Arc<Subscription>,
}

impl Catalog {
    pub fn new(
        records: Arc<dyn RecordStore>,
        users: Arc<dyn UserDirectory>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let feed = ChangeFeed::new();
        let config = Arc::new(ConfigCache::default());
        // Subscribed first so views reloading on the same event see the new configuration.
        let watch = {
            let config = config.clone();
            feed.subscribe(
                move |event| {
                    if event == ChangeEvent::Configuration {
                        config.invalidate();
                    }
                },
                |_| {},
            )
        };
        Catalog {
            records,
            users,
            blobs,
            feed,
            config,
            _config_watch: Arc::new(watch),
        }
    }

    pub fn live_view(&self) -> Result<Arc<LiveView>, StoreError> {
        LiveView::attach(self.records.clone(), self.config.clone(), &self.feed)
    }

    #[cfg(test)]
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    /// Effective field configuration: the stored record, or the one recovered from provenance.
    pub fn configuration(&self) -> Result<Option<FieldConfiguration>, StoreError> {
        let stored = self.config.get(self.records.as_ref())?;
        if stored.is_some() {
            return Ok(stored);
        }
        let records = self.records.list_records()?;
        Ok(fields::resolve_configuration(None, &records))
    }

    /// Announces transport failures to feed subscribers before handing the error on.
    fn failed(&self, error: StoreError) -> StoreError {
        if error.is_transport() {
            self.feed.publish_error(&error);
        }
        error
    }

    fn existing(&self, id: &str) -> Result<Record, CatalogError> {
        self.records
            .get_record(id)
            .map_err(|e| self.failed(e))?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    pub fn get_object(&self, user: &ActingUser, id: &str) -> Result<Record, CatalogError> {
        require_view(user)?;
        self.existing(id)
    }

    /// The record plus resolved image URLs.
    pub fn object_detail(&self, user: &ActingUser, id: &str) -> Result<ObjectDetail, CatalogError> {
        let record = self.get_object(user, id)?;
        let image_urls = record
            .reserved
            .images
            .iter()
            .map(|reference| self.blobs.resolve(reference))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ObjectDetail { record, image_urls })
    }

    pub fn create_object(&self, user: &ActingUser, fields: FieldMap) -> Result<Record, CatalogError> {
        require_edit(user)?;
        let fields = trimmed(fields);
        let names: Vec<String> = fields.keys().cloned().collect();
        if !has_meaningful_content(&names, &fields) {
            return Err(CatalogError::Invalid(
                "An object needs a name, number, title or a value in its first field".to_string(),
            ));
        }

        let id = self
            .records
            .create_record(NewRecord {
                fields,
                created_by: Some(user.id.clone()),
                ..Default::default()
            })
            .map_err(|e| self.failed(e))?;
        info!("Object {} created by {}", id, user.id);
        self.feed.publish(ChangeEvent::Records);
        self.existing(&id)
    }

    /// Merges `fields` into the record; fields not mentioned keep their value.
    pub fn update_object(
        &self,
        user: &ActingUser,
        id: &str,
        fields: FieldMap,
    ) -> Result<Record, CatalogError> {
        require_edit(user)?;
        let patch = RecordPatch {
            fields: Some(trimmed(fields)),
            images: None,
        };
        self.records.update_record(id, &patch).map_err(|e| match e {
            StoreError::NotFound(_) => CatalogError::NotFound(id.to_string()),
            other => self.failed(other).into(),
        })?;
        self.feed.publish(ChangeEvent::Records);
        self.existing(id)
    }

    /// Deletes the record. Its images are removed best-effort first; failures are only logged.
    pub fn delete_object(&self, user: &ActingUser, id: &str) -> Result<(), CatalogError> {
        require_edit(user)?;
        let record = self.existing(id)?;
        for reference in &record.reserved.images {
            self.discard_blob(reference);
        }
        self.records.delete_record(id).map_err(|e| match e {
            StoreError::NotFound(_) => CatalogError::NotFound(id.to_string()),
            other => self.failed(other).into(),
        })?;
        info!("Object {} deleted by {}", id, user.id);
        self.feed.publish(ChangeEvent::Records);
        Ok(())
    }

    pub fn add_image(
        &self,
        user: &ActingUser,
        id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Record, CatalogError> {
        require_edit(user)?;
        let record = self.existing(id)?;
        if record.reserved.images.len() >= MAX_IMAGES {
            return Err(CatalogError::TooManyImages);
        }

        let reference = self.blobs.upload(&image_path(filename), bytes)?;
        let mut images = record.reserved.images;
        images.push(reference.clone());
        let patch = RecordPatch {
            fields: None,
            images: Some(images),
        };
        if let Err(e) = self.records.update_record(id, &patch) {
            self.discard_blob(&reference);
            return Err(self.failed(e).into());
        }
        self.feed.publish(ChangeEvent::Records);
        self.existing(id)
    }

    pub fn remove_image(
        &self,
        user: &ActingUser,
        id: &str,
        reference: &str,
    ) -> Result<Record, CatalogError> {
        require_edit(user)?;
        let record = self.existing(id)?;
        if !record.reserved.images.iter().any(|r| r == reference) {
            return Err(CatalogError::NotFound(format!("{} image {}", id, reference)));
        }

        self.discard_blob(reference);
        let images = record
            .reserved
            .images
            .into_iter()
            .filter(|r| r != reference)
            .collect();
        let patch = RecordPatch {
            fields: None,
            images: Some(images),
        };
        self.records
            .update_record(id, &patch)
            .map_err(|e| self.failed(e))?;
        self.feed.publish(ChangeEvent::Records);
        self.existing(id)
    }

    fn discard_blob(&self, reference: &str) {
        if let Err(e) = self.blobs.delete(reference) {
            warn!("Could not delete image {}: {}", reference, e);
        }
    }

    /// Runs an import and announces the result once, after the last row.
    pub fn import(
        &self,
        job: &ImportJob<'_>,
        user: &ActingUser,
        progress: &mut dyn FnMut(usize),
    ) -> Result<ImportOutcome, ImportError> {
        let result = run_import(self.records.as_ref(), job, user, progress);
        match &result {
            Ok(outcome) if outcome.imported > 0 => {
                self.feed.publish(ChangeEvent::Records);
                self.feed.publish(ChangeEvent::Configuration);
            }
            Err(ImportError::Store { source, imported }) => {
                if *imported > 0 {
                    self.feed.publish(ChangeEvent::Records);
                }
                if source.is_transport() {
                    self.feed.publish_error(source);
                }
            }
            _ => {}
        }
        result
    }
}
