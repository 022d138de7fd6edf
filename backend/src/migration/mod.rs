//! The migration engine: everything between an uploaded CSV export and
//! canonical records in the tenant store.
//!
//! Pipeline: column mapping against the alias catalog, per-field type
//! normalization, validation with partial-failure tolerance (together the
//! "preview"), then a dependency-ordered, idempotent import tagged with a
//! batch id that the ledger can roll back.

pub mod catalog;
pub mod error;
pub mod import;
pub mod mapper;
pub mod normalize;
pub mod session;
pub mod store;
pub mod validate;

use std::collections::BTreeMap;

use common::model::entity::EntityKind;
use common::model::mapping::ColumnMapping;
use common::model::validation::ValidationOutcome;

use crate::migration::catalog::AliasCatalog;
use crate::migration::error::MigrationError;
use crate::migration::normalize::RawRow;

/// Picks the most plausible delimiter by counting occurrences in the header
/// line. Comma wins ties.
pub fn detect_delimiter(header_line: &str) -> u8 {
    [b',', b';', b'\t', b'|']
        .iter()
        .max_by_key(|&&d| header_line.matches(d as char).count())
        .copied()
        .unwrap_or(b',')
}

/// Parses the staged CSV bytes into trimmed headers plus raw rows (source
/// column -> raw cell). Fails with `EmptyInput` when the file has no data
/// rows.
pub fn read_csv(bytes: &[u8]) -> Result<(Vec<String>, Vec<RawRow>), MigrationError> {
    let header_line = bytes
        .split(|&b| b == b'\n')
        .next()
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .unwrap_or_default();
    let delimiter = detect_delimiter(&header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(MigrationError::EmptyInput);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(value) = record.get(idx) {
                row.insert(header.clone(), value.to_string());
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(MigrationError::EmptyInput);
    }
    Ok((headers, rows))
}

/// Everything the preview computes for one uploaded file.
#[derive(Debug, Clone)]
pub struct PreviewData {
    pub mapping: ColumnMapping,
    pub outcome: ValidationOutcome,
    pub total_rows: usize,
}

/// Runs the read -> map -> normalize -> validate pipeline over staged CSV
/// bytes. A caller-supplied override mapping skips auto-detection entirely.
pub fn preview_rows(
    catalog: &AliasCatalog,
    source_system: &str,
    entity: EntityKind,
    bytes: &[u8],
    mapping_override: Option<BTreeMap<String, String>>,
) -> Result<PreviewData, MigrationError> {
    let (headers, raw_rows) = read_csv(bytes)?;

    let mapping = match mapping_override {
        Some(manual) => ColumnMapping::from_override(manual),
        None => mapper::map_columns(catalog, source_system, entity, &headers)?,
    };

    Ok(run_rows(mapping, entity, &raw_rows))
}

/// Same pipeline, but with a mapping that already exists: the confirm path,
/// which reuses the session's stored mapping (or a fresh override) instead
/// of re-detecting columns.
pub fn pipeline_with_mapping(
    mapping: ColumnMapping,
    entity: EntityKind,
    bytes: &[u8],
) -> Result<PreviewData, MigrationError> {
    let (_headers, raw_rows) = read_csv(bytes)?;
    Ok(run_rows(mapping, entity, &raw_rows))
}

fn run_rows(mapping: ColumnMapping, entity: EntityKind, raw_rows: &[RawRow]) -> PreviewData {
    let normalized: Vec<_> = raw_rows
        .iter()
        .map(|raw| normalize::normalize_row(&mapping, entity, raw))
        .collect();
    let total_rows = normalized.len();
    let outcome = validate::validate_rows(entity, normalized);

    PreviewData {
        mapping,
        outcome,
        total_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolons_and_tabs() {
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("a|b|c"), b'|');
        assert_eq!(detect_delimiter("one_column"), b',');
    }

    #[test]
    fn reads_quoted_fields_and_uneven_rows() {
        let bytes = b"Name,Notes\n\"Doe, Jane\",likes commas\nBob\n";
        let (headers, rows) = read_csv(bytes).unwrap();
        assert_eq!(headers, vec!["Name", "Notes"]);
        assert_eq!(rows[0]["Name"], "Doe, Jane");
        // short record simply lacks the trailing column
        assert!(!rows[1].contains_key("Notes"));
    }

    #[test]
    fn empty_file_and_header_only_are_empty_input() {
        assert!(matches!(read_csv(b"").unwrap_err(), MigrationError::EmptyInput));
        assert!(matches!(
            read_csv(b"First Name,Last Name\n").unwrap_err(),
            MigrationError::EmptyInput
        ));
    }

    #[test]
    fn preview_pipeline_end_to_end() {
        let catalog = AliasCatalog::load().unwrap();
        let bytes = b"First Name,Last Name,Email\nJane,Doe,JANE@Example.com\nBob,,\n,Lee,lee@example.com\n";
        let data = preview_rows(&catalog, "generic_csv", EntityKind::Contact, bytes, None).unwrap();

        assert_eq!(data.total_rows, 3);
        assert_eq!(data.outcome.valid.len(), 1);
        assert_eq!(data.outcome.invalid.len(), 2);
        // email was lowercased on the way through
        assert_eq!(
            common::model::cell::field_str(&data.outcome.valid[0].row, "email"),
            Some("jane@example.com")
        );
        // spreadsheet-aligned indexes: rows 3 and 4 are the broken ones
        let bad: Vec<usize> = data.outcome.invalid.iter().map(|i| i.row_index).collect();
        assert_eq!(bad, vec![3, 4]);
    }

    #[test]
    fn preview_confirm_rollback_end_to_end() {
        use crate::migration::import::{import_rows, ImportContext};
        use crate::migration::session::{create_session, load_session, rollback_batch};
        use crate::migration::store::MigrationStore;

        let catalog = AliasCatalog::load().unwrap();
        let store = MigrationStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let bytes: &[u8] =
            b"First Name,Last Name,Email\nJane,Doe,jane@example.com\nBob,Lee,bob@example.com\nAmy,Wu,amy@example.com\n";

        // preview
        let data = preview_rows(&catalog, "generic_csv", EntityKind::Contact, bytes, None).unwrap();
        assert_eq!(data.outcome.valid.len(), 3);
        assert_eq!(data.outcome.invalid.len(), 0);
        let session_id = create_session(
            &store,
            dir.path(),
            "generic_csv",
            EntityKind::Contact,
            &data.mapping,
            bytes,
        )
        .unwrap();

        // confirm: reload the session and import under a fresh batch id
        let (session, staged) = load_session(&store, dir.path(), &session_id).unwrap();
        let reloaded = pipeline_with_mapping(session.mapping, session.entity, &staged).unwrap();
        let ctx = ImportContext {
            batch_id: "batch-e2e",
            source_system: &session.source_system,
            deadline: None,
        };
        let outcome =
            import_rows(&store, session.entity, &reloaded.outcome.valid, &ctx, |_, _| {}).unwrap();
        assert_eq!(outcome.inserted_count, 3);
        assert!(outcome.errors.is_empty());
        assert_eq!(store.count(EntityKind::Contact).unwrap(), 3);

        // rollback removes all three
        let report = rollback_batch(&store, "batch-e2e");
        assert!(report.success);
        assert_eq!(store.count(EntityKind::Contact).unwrap(), 0);
        assert_eq!(store.count_batch(EntityKind::Contact, "batch-e2e").unwrap(), 0);
    }

    #[test]
    fn preview_with_override_skips_detection() {
        let catalog = AliasCatalog::load().unwrap();
        let mut manual = BTreeMap::new();
        manual.insert("first_name".to_string(), "A".to_string());
        manual.insert("last_name".to_string(), "B".to_string());
        let bytes = b"A,B\nJane,Doe\n";
        let data = preview_rows(
            &catalog,
            // even an unknown system works: override is caller-trusted
            "some_future_crm",
            EntityKind::Contact,
            bytes,
            Some(manual),
        )
        .unwrap();
        assert_eq!(data.outcome.valid.len(), 1);
        assert!(data.mapping.unmapped_fields.is_empty());
        assert!(data.mapping.unclaimed_columns.is_empty());
    }
}
