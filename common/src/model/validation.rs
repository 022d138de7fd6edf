use serde::{Deserialize, Serialize};

use crate::model::cell::NormalizedRow;

/// A row that passed validation, tagged with its spreadsheet-aligned row
/// index (0-based data position + 2: one for 1-based rows, one for the
/// header line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidRow {
    pub row_index: usize,
    pub row: NormalizedRow,
}

/// A row that failed validation, with one message per problem found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub row_index: usize,
    pub row: NormalizedRow,
    pub errors: Vec<String>,
}

/// Validator output: the valid/invalid partition of one file's rows.
/// A row with any error is entirely excluded from `valid`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: Vec<ValidRow>,
    pub invalid: Vec<ValidationIssue>,
}
