use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The result of matching a CSV header row against a source system's alias
/// table for one entity.
///
/// `mapping` goes canonical field -> source column. Fields with no matching
/// header land in `unmapped_fields`; headers no field claimed land in
/// `unclaimed_columns`. A caller-supplied override produces a mapping with
/// both residual lists empty regardless of coverage; overrides are
/// caller-trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub mapping: BTreeMap<String, String>,
    pub unmapped_fields: Vec<String>,
    pub unclaimed_columns: Vec<String>,
}

impl ColumnMapping {
    /// Builds a caller-trusted mapping that bypassed auto-detection.
    pub fn from_override(mapping: BTreeMap<String, String>) -> Self {
        ColumnMapping {
            mapping,
            unmapped_fields: Vec::new(),
            unclaimed_columns: Vec::new(),
        }
    }

    pub fn source_column(&self, canonical_field: &str) -> Option<&str> {
        self.mapping.get(canonical_field).map(String::as_str)
    }
}
