use serde::{Deserialize, Serialize};

use crate::model::mapping::ColumnMapping;
use crate::model::validation::{ValidRow, ValidationIssue};

/// Row-count and coverage summary shown to the user before they confirm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub unmapped_fields: Vec<String>,
    pub unclaimed_columns: Vec<String>,
}

/// Response of the preview endpoint: the pending session plus everything a
/// wizard needs to render the mapping step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub session_id: String,
    pub mapping: ColumnMapping,
    pub summary: PreviewSummary,
    pub sample_rows: Vec<ValidRow>,
    pub sample_errors: Vec<ValidationIssue>,
}
