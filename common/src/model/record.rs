use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Operator-defined fields of a record, in insertion order.
///
/// Field names are whatever the CSV headers (or the edit form) said they were; nothing
/// about the catalog schema is fixed at build time.
pub type FieldMap = IndexMap<String, String>;

/// One catalog entry as stored in the `objects` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier assigned by the record store.
    pub id: String,
    /// Attributes owned by the service rather than by the operator.
    pub reserved: ReservedAttributes,
    /// The user-visible field values.
    pub fields: FieldMap,
}

impl Record {
    /// Value of `field`, or the empty string when the record does not carry it.
    pub fn value(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }
}

/// Attributes that never show up in the field set.
///
/// The three provenance attributes are attached to every record created by a CSV import and
/// describe the configuration that import established.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservedAttributes {
    /// RFC 3339 creation timestamp, assigned by the store.
    pub created_at: Option<String>,
    pub created_by: Option<String>,
    /// Blob references, at most three.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable_fields: Option<Vec<String>>,
}

/// A record together with fetchable URLs for its images, in the order of `reserved.images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetail {
    #[serde(flatten)]
    pub record: Record,
    pub image_urls: Vec<String>,
}

/// Data handed to the store when creating a record. Id and timestamp are assigned there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRecord {
    pub fields: FieldMap,
    pub created_by: Option<String>,
    pub images: Vec<String>,
    pub provenance: Option<ImportProvenance>,
}

/// Configuration an import run stamps onto each record it creates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportProvenance {
    pub field_order: Vec<String>,
    pub filterable_fields: Vec<String>,
    pub searchable_fields: Vec<String>,
}

/// Partial update of an existing record. `None` leaves the part untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// Merged into the existing fields; keys not mentioned keep their value.
    pub fields: Option<FieldMap>,
    /// Replaces the image list.
    pub images: Option<Vec<String>>,
}

/// One page of a filtered record listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of records matching the query before pagination.
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
}
