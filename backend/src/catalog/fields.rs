//! Field reconciliation: which fields exist, in what order, and how they are presented.
//!
//! The collection has no fixed schema. The active field order is taken, in this order of
//! precedence, from the headers of an open import session, from the field configuration, from
//! the sorted union of field names found on records, or is empty.

use common::model::field_config::{FieldConfiguration, FieldDescriptor};
use common::model::record::Record;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Effective configuration for the collection.
///
/// The configuration record wins when present. Otherwise each attribute is taken from the first
/// record carrying it, as records created by older imports hold a copy of the configuration
/// that was active when they were written.
pub fn resolve_configuration(
    stored: Option<&FieldConfiguration>,
    records: &[Record],
) -> Option<FieldConfiguration> {
    if let Some(stored) = stored {
        return Some(stored.clone());
    }

    let field_order = records.iter().find_map(|r| r.reserved.field_order.clone());
    let filterable = records
        .iter()
        .find_map(|r| r.reserved.filterable_fields.clone());
    let searchable = records
        .iter()
        .find_map(|r| r.reserved.searchable_fields.clone());

    if field_order.is_none() && filterable.is_none() && searchable.is_none() {
        return None;
    }
    Some(FieldConfiguration {
        version: 0,
        field_order: field_order.unwrap_or_default(),
        filterable_fields: filterable.unwrap_or_default(),
        searchable_fields: searchable.unwrap_or_default(),
        updated_by: None,
        updated_at: None,
    })
}

pub fn reconcile_field_order(
    session_headers: Option<&[String]>,
    configuration: Option<&FieldConfiguration>,
    records: &[Record],
) -> Vec<String> {
    if let Some(headers) = session_headers.filter(|h| !h.is_empty()) {
        return headers.to_vec();
    }
    if let Some(config) = configuration.filter(|c| !c.field_order.is_empty()) {
        return config.field_order.clone();
    }
    observed_field_names(records)
}

/// Every field name carried by any record, sorted.
pub fn observed_field_names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.fields.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted unique non-empty values of each filterable field.
pub fn filter_options(records: &[Record], filterable: &[String]) -> IndexMap<String, Vec<String>> {
    filterable
        .iter()
        .map(|field| {
            let values: BTreeSet<&str> = records
                .iter()
                .map(|r| r.value(field))
                .filter(|v| !v.is_empty())
                .collect();
            (
                field.clone(),
                values.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

pub fn describe_fields(
    field_order: &[String],
    configuration: Option<&FieldConfiguration>,
) -> Vec<FieldDescriptor> {
    let has = |list: Option<&Vec<String>>, name: &String| list.is_some_and(|l| l.contains(name));
    field_order
        .iter()
        .map(|name| FieldDescriptor {
            name: name.clone(),
            label: derive_label(name),
            filterable: has(configuration.map(|c| &c.filterable_fields), name),
            searchable: has(configuration.map(|c| &c.searchable_fields), name),
        })
        .collect()
}

/// Human readable label for a field name: `museographicIndex` becomes `Museographic Index`,
/// `state_of-preservation` becomes `State Of Preservation`.
pub fn derive_label(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();

    for (idx, &ch) in chars.iter().enumerate() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[idx - 1];
            let next_is_lower = chars.get(idx + 1).is_some_and(|c| c.is_lowercase());
            // fooBar, item2Name, and the `S` of HTTPServer
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower)
            {
                tokens.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .iter()
        .map(|token| title_case(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::record::{FieldMap, ReservedAttributes};

    fn record(pairs: &[(&str, &str)], field_order: Option<&[&str]>) -> Record {
        Record {
            id: "r".to_string(),
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<FieldMap>(),
            reserved: ReservedAttributes {
                field_order: field_order.map(|o| o.iter().map(|s| s.to_string()).collect()),
                ..Default::default()
            },
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn labels_split_case_and_separators() {
        assert_eq!(derive_label("museographicIndex"), "Museographic Index");
        assert_eq!(derive_label("state_of-preservation"), "State Of Preservation");
        assert_eq!(derive_label("Name of Object"), "Name Of Object");
        assert_eq!(derive_label("HTTPServer"), "Http Server");
        assert_eq!(derive_label("item2Name"), "Item2 Name");
        assert_eq!(derive_label("No"), "No");
        assert_eq!(derive_label("__"), "");
    }

    #[test]
    fn session_headers_take_precedence() {
        let config = FieldConfiguration {
            field_order: strings(&["B"]),
            ..Default::default()
        };
        let headers = strings(&["X", "Y"]);
        let no_headers: Vec<String> = Vec::new();
        assert_eq!(
            reconcile_field_order(Some(headers.as_slice()), Some(&config), &[]),
            headers
        );
        assert_eq!(
            reconcile_field_order(Some(no_headers.as_slice()), Some(&config), &[]),
            strings(&["B"])
        );
    }

    #[test]
    fn observed_names_are_sorted_when_nothing_is_configured() {
        let records = vec![
            record(&[("Type", "a"), ("Name", "b")], None),
            record(&[("Dating", "c")], None),
        ];
        assert_eq!(
            reconcile_field_order(None, None, &records),
            strings(&["Dating", "Name", "Type"])
        );
        assert!(reconcile_field_order(None, None, &[]).is_empty());
    }

    #[test]
    fn provenance_of_the_first_carrying_record_is_the_fallback() {
        let records = vec![
            record(&[("Name", "a")], None),
            record(&[("Name", "b")], Some(&["Name", "No"])),
            record(&[("Name", "c")], Some(&["Other"])),
        ];
        let resolved = resolve_configuration(None, &records).unwrap();
        assert_eq!(resolved.version, 0);
        assert_eq!(resolved.field_order, strings(&["Name", "No"]));
        assert!(resolve_configuration(None, &records[..1]).is_none());
    }

    #[test]
    fn filter_options_are_unique_sorted_and_non_empty() {
        let records = vec![
            record(&[("Type", "Statue")], None),
            record(&[("Type", "")], None),
            record(&[("Type", "Amulet")], None),
            record(&[("Type", "Statue")], None),
        ];
        let options = filter_options(&records, &strings(&["Type", "Missing"]));
        assert_eq!(options["Type"], strings(&["Amulet", "Statue"]));
        assert!(options["Missing"].is_empty());
    }

    #[test]
    fn descriptors_flag_configured_fields() {
        let config = FieldConfiguration {
            filterable_fields: strings(&["type"]),
            searchable_fields: strings(&["name"]),
            ..Default::default()
        };
        let fields = describe_fields(&strings(&["name", "type"]), Some(&config));
        assert!(fields[0].searchable && !fields[0].filterable);
        assert!(fields[1].filterable && !fields[1].searchable);
        assert_eq!(fields[1].label, "Type");
    }
}
