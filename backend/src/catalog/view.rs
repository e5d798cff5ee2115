//! Derived, read-only views of the collection.
//!
//! `CatalogSnapshot` is a pure function of the records and the stored configuration: field
//! order, filter options and every listing page are recomputed from it. `LiveView` keeps the
//! latest snapshot and rebuilds it on every change notification.

use crate::catalog::feed::{ChangeFeed, Subscription};
use crate::catalog::fields::{
    describe_fields, filter_options, reconcile_field_order, resolve_configuration,
};
use crate::catalog::ConfigCache;
use crate::store::{RecordStore, StoreError};
use common::model::field_config::{FieldConfiguration, FieldLayout};
use common::model::record::{Page, Record};
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub records: Vec<Record>,
    /// Effective configuration: the stored record, or the one recovered from provenance.
    pub configuration: Option<FieldConfiguration>,
    pub field_order: Vec<String>,
    pub filter_options: IndexMap<String, Vec<String>>,
}

impl CatalogSnapshot {
    pub fn derive(records: Vec<Record>, stored: Option<&FieldConfiguration>) -> Self {
        let configuration = resolve_configuration(stored, &records);
        let field_order = reconcile_field_order(None, configuration.as_ref(), &records);
        let filterable = configuration
            .as_ref()
            .map(|c| c.filterable_fields.as_slice())
            .unwrap_or(&[]);
        let filter_options = filter_options(&records, filterable);
        CatalogSnapshot {
            records,
            configuration,
            field_order,
            filter_options,
        }
    }

    pub fn load(store: &dyn RecordStore, config: &ConfigCache) -> Result<Self, StoreError> {
        let stored = config.get(store)?;
        let records = store.list_records()?;
        Ok(CatalogSnapshot::derive(records, stored.as_ref()))
    }

    /// Field order relative to an open import session, if any.
    pub fn field_order_for(&self, session_headers: Option<&[String]>) -> Vec<String> {
        match session_headers {
            Some(headers) if !headers.is_empty() => {
                reconcile_field_order(Some(headers), self.configuration.as_ref(), &self.records)
            }
            _ => self.field_order.clone(),
        }
    }

    pub fn layout(&self, session_headers: Option<&[String]>) -> FieldLayout {
        let order = self.field_order_for(session_headers);
        FieldLayout {
            version: self.configuration.as_ref().map(|c| c.version).unwrap_or(0),
            fields: describe_fields(&order, self.configuration.as_ref()),
            filter_options: self.filter_options.clone(),
        }
    }

    /// Fields free-text search looks at: the configured searchable fields, or every field of
    /// the current order when none are configured.
    fn search_fields(&self) -> &[String] {
        match &self.configuration {
            Some(c) if !c.searchable_fields.is_empty() => &c.searchable_fields,
            _ => &self.field_order,
        }
    }

    pub fn query(&self, query: &ListQuery) -> Page<Record> {
        let needle = query.text.as_deref().map(str::to_lowercase);
        let search_fields = self.search_fields();

        let matching: Vec<&Record> = self
            .records
            .iter()
            .filter(|r| {
                query
                    .filters
                    .iter()
                    .all(|(field, wanted)| r.value(field) == wanted.as_str())
            })
            .filter(|r| match &needle {
                Some(needle) => search_fields
                    .iter()
                    .any(|f| r.value(f).to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .collect();

        let start = query.page.saturating_sub(1).saturating_mul(query.page_size);
        Page {
            total: matching.len(),
            items: matching
                .into_iter()
                .skip(start)
                .take(query.page_size)
                .cloned()
                .collect(),
            page: query.page,
            page_size: query.page_size,
        }
    }
}

/// Listing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Free-text search, already trimmed; `None` when blank.
    pub text: Option<String>,
    /// Exact-match filters keyed by field name.
    pub filters: IndexMap<String, String>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            text: None,
            filters: IndexMap::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    /// Reads `q`, `page`, `page_size` and `filter.<field>` parameters. Unparseable numbers
    /// fall back to the defaults and blank filters are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let number = |key: &str| params.get(key).and_then(|v| v.trim().parse::<usize>().ok());

        let mut filters: Vec<(String, String)> = params
            .iter()
            .filter_map(|(key, value)| {
                let field = key.strip_prefix("filter.")?;
                (!field.is_empty() && !value.is_empty())
                    .then(|| (field.to_string(), value.clone()))
            })
            .collect();
        filters.sort();

        ListQuery {
            text: params
                .get("q")
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            filters: filters.into_iter().collect(),
            page: number("page").filter(|p| *p > 0).unwrap_or(1),
            page_size: number("page_size")
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// Latest snapshot of the collection, refreshed from the change feed.
///
/// Reloads run on whichever thread publishes. Each one is stamped before it reads the store,
/// and a snapshot only replaces one with an older stamp.
pub struct LiveView {
    current: RwLock<Stamped>,
    reloads: AtomicU64,
    subscription: RwLock<Option<Subscription>>,
}

struct Stamped {
    generation: u64,
    snapshot: Arc<CatalogSnapshot>,
}

impl LiveView {
    /// Loads the first snapshot and subscribes to `feed`. Every later event triggers a full
    /// reload; a failed reload keeps the previous snapshot.
    pub fn attach(
        store: Arc<dyn RecordStore>,
        config: Arc<ConfigCache>,
        feed: &ChangeFeed,
    ) -> Result<Arc<Self>, StoreError> {
        let initial = CatalogSnapshot::load(store.as_ref(), &config)?;
        let view = Arc::new(LiveView {
            current: RwLock::new(Stamped {
                generation: 0,
                snapshot: Arc::new(initial),
            }),
            reloads: AtomicU64::new(0),
            subscription: RwLock::new(None),
        });

        let weak: Weak<LiveView> = Arc::downgrade(&view);
        let subscription = feed.subscribe(
            move |event| {
                let Some(view) = weak.upgrade() else { return };
                debug!("Refreshing catalog view after {:?} change", event);
                let generation = view.reloads.fetch_add(1, Ordering::SeqCst) + 1;
                match CatalogSnapshot::load(store.as_ref(), &config) {
                    Ok(snapshot) => view.replace(generation, snapshot),
                    Err(e) => warn!("Catalog view refresh failed: {}", e),
                }
            },
            |error| warn!("Catalog change feed error: {}", error),
        );
        *view
            .subscription
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
        Ok(view)
    }

    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    fn replace(&self, generation: u64, snapshot: CatalogSnapshot) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if generation < current.generation {
            debug!(
                "Dropping catalog view reload {} superseded by {}",
                generation, current.generation
            );
            return;
        }
        *current = Stamped {
            generation,
            snapshot: Arc::new(snapshot),
        };
    }

    /// Stops following the feed. The last snapshot stays readable.
    pub fn detach(&self) {
        self.subscription
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
