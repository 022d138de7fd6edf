//! Column Mapper: matches a CSV header row against the alias catalog for one
//! (source system, entity) pair.
//!
//! Headers and alias candidates are compared after trimming and lowercasing.
//! For each canonical field the candidate list is walked in order and the
//! first header whose normalized form equals the candidate wins. When two
//! headers normalize to the same candidate only the first one (in header
//! order) is used; later duplicates are silently ignored for that field.

use common::model::entity::{canonical_fields, EntityKind};
use common::model::mapping::ColumnMapping;

use crate::migration::catalog::AliasCatalog;
use crate::migration::error::MigrationError;

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Auto-detects the canonical-field -> source-column mapping.
///
/// Fields with no matching header are reported in `unmapped_fields` (not an
/// error; the caller decides what to do with the gap). Headers never claimed
/// by any field are reported in `unclaimed_columns`. Fails only when the
/// (source system, entity) pair has no catalog entry.
pub fn map_columns(
    catalog: &AliasCatalog,
    source_system: &str,
    entity: EntityKind,
    headers: &[String],
) -> Result<ColumnMapping, MigrationError> {
    let aliases = catalog
        .lookup(source_system, entity)
        .ok_or_else(|| MigrationError::UnknownSourceSystem(source_system.to_string()))?;

    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let mut result = ColumnMapping::default();
    let mut claimed = vec![false; headers.len()];

    for field in canonical_fields(entity) {
        let candidates = match aliases.get(field.name) {
            Some(c) => c,
            None => {
                result.unmapped_fields.push(field.name.to_string());
                continue;
            }
        };

        let mut matched = None;
        'candidates: for candidate in candidates {
            let candidate = normalize_header(candidate);
            for (idx, header) in normalized.iter().enumerate() {
                if *header == candidate {
                    matched = Some(idx);
                    break 'candidates;
                }
            }
        }

        match matched {
            Some(idx) => {
                claimed[idx] = true;
                result
                    .mapping
                    .insert(field.name.to_string(), headers[idx].trim().to_string());
            }
            None => result.unmapped_fields.push(field.name.to_string()),
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        if !claimed[idx] {
            result.unclaimed_columns.push(header.trim().to_string());
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn maps_generic_contact_headers() {
        let catalog = AliasCatalog::load().unwrap();
        let mapping = map_columns(
            &catalog,
            "generic_csv",
            EntityKind::Contact,
            &headers(&["First Name", "Last Name", "Email", "Mystery Column"]),
        )
        .unwrap();

        assert_eq!(mapping.source_column("first_name"), Some("First Name"));
        assert_eq!(mapping.source_column("last_name"), Some("Last Name"));
        assert_eq!(mapping.source_column("email"), Some("Email"));
        assert!(mapping.unmapped_fields.contains(&"phone".to_string()));
        assert_eq!(mapping.unclaimed_columns, vec!["Mystery Column"]);
    }

    #[test]
    fn matching_is_case_insensitive_and_trims() {
        let catalog = AliasCatalog::load().unwrap();
        let mapping = map_columns(
            &catalog,
            "generic_csv",
            EntityKind::Contact,
            &headers(&["  FIRST NAME  ", "last name"]),
        )
        .unwrap();
        assert_eq!(mapping.source_column("first_name"), Some("FIRST NAME"));
        assert_eq!(mapping.source_column("last_name"), Some("last name"));
    }

    #[test]
    fn earlier_candidate_beats_later_one() {
        // generic job "value" candidates are [value, amount, total, ...];
        // with both "Amount" and "Total" present, "Amount" must win.
        let catalog = AliasCatalog::load().unwrap();
        let mapping = map_columns(
            &catalog,
            "generic_csv",
            EntityKind::Job,
            &headers(&["Title", "Total", "Amount"]),
        )
        .unwrap();
        assert_eq!(mapping.source_column("value"), Some("Amount"));
        assert_eq!(mapping.unclaimed_columns, vec!["Total"]);
    }

    #[test]
    fn duplicate_header_claimed_once() {
        let catalog = AliasCatalog::load().unwrap();
        let mapping = map_columns(
            &catalog,
            "generic_csv",
            EntityKind::Contact,
            &headers(&["Email", "Email"]),
        )
        .unwrap();
        // first occurrence wins, the duplicate stays unclaimed
        assert_eq!(mapping.source_column("email"), Some("Email"));
        assert_eq!(mapping.unclaimed_columns, vec!["Email"]);
    }

    #[test]
    fn deterministic_for_fixed_input() {
        let catalog = AliasCatalog::load().unwrap();
        let hs = headers(&["First Name", "Last Name", "Email", "Phone", "City"]);
        let a = map_columns(&catalog, "generic_csv", EntityKind::Contact, &hs).unwrap();
        let b = map_columns(&catalog, "generic_csv", EntityKind::Contact, &hs).unwrap();
        assert_eq!(a.mapping, b.mapping);
        assert_eq!(a.unmapped_fields, b.unmapped_fields);
        assert_eq!(a.unclaimed_columns, b.unclaimed_columns);
    }

    #[test]
    fn unknown_source_system_fails() {
        let catalog = AliasCatalog::load().unwrap();
        let err = map_columns(
            &catalog,
            "pipedrive",
            EntityKind::Contact,
            &headers(&["Email"]),
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::UnknownSourceSystem(_)));
    }

    #[test]
    fn override_reports_empty_residuals() {
        let mut manual = BTreeMap::new();
        manual.insert("first_name".to_string(), "Weird Col A".to_string());
        let mapping = ColumnMapping::from_override(manual);
        assert_eq!(mapping.source_column("first_name"), Some("Weird Col A"));
        assert!(mapping.unmapped_fields.is_empty());
        assert!(mapping.unclaimed_columns.is_empty());
    }
}
