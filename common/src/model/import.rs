use serde::{Deserialize, Serialize};

use crate::model::entity::EntityKind;

/// A single row's persistence failure. Collected, never thrown, since one
/// bad row must not abort the rest of the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row_index: usize,
    pub error: String,
}

/// What one importer pass over one entity's rows produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub inserted_count: usize,
    pub errors: Vec<RowError>,
    /// True when an external deadline cut the pass short; `inserted_count`
    /// then reflects only the rows processed before the cutoff.
    pub deadline_hit: bool,
}

/// Final report of a confirmed import, carried in the job's Completed status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmReport {
    pub batch_id: String,
    pub entity: EntityKind,
    pub inserted_count: usize,
    pub error_count: usize,
    pub sample_errors: Vec<RowError>,
    pub deadline_hit: bool,
}

/// Per-table result of a rollback attempt, reported separately so a partial
/// rollback is distinguishable from a total one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRollback {
    pub entity: EntityKind,
    pub deleted: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackReport {
    pub batch_id: String,
    pub success: bool,
    pub tables: Vec<TableRollback>,
}
