use thiserror::Error;

/// Fatal errors of the migration engine.
///
/// Only conditions that abort a whole preview/confirm/rollback call live
/// here. Per-row validation and persistence failures are collected as data
/// (`ValidationIssue`, `RowError`) and never raised.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Unknown source system: {0}")]
    UnknownSourceSystem(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("The file contains no data rows")]
    EmptyInput,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
