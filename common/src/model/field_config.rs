use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The collection-wide field configuration.
///
/// Written by every import run that created at least one record. A `version` of zero marks a
/// configuration recovered from record provenance rather than read from the configuration
/// record itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfiguration {
    pub version: u64,
    pub field_order: Vec<String>,
    pub filterable_fields: Vec<String>,
    pub searchable_fields: Vec<String>,
    pub updated_by: Option<String>,
    pub updated_at: Option<String>,
}

/// What an import run asks the store to persist as the new configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDraft {
    pub field_order: Vec<String>,
    pub filterable_fields: Vec<String>,
    pub searchable_fields: Vec<String>,
    pub updated_by: String,
}

/// Presentation data for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Human readable label derived from `name`.
    pub label: String,
    pub filterable: bool,
    pub searchable: bool,
}

/// Everything a client needs to render forms, filters and tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    /// Version of the configuration record in effect, zero when there is none.
    pub version: u64,
    pub fields: Vec<FieldDescriptor>,
    /// Sorted unique non-empty values of each filterable field.
    pub filter_options: IndexMap<String, Vec<String>>,
}
