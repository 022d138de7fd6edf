use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::entity::EntityKind;

/// The `json` part of the preview multipart upload: which source system and
/// entity the accompanying CSV file holds, plus an optional caller-supplied
/// column mapping that bypasses auto-detection entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewMeta {
    pub source_system: String,
    pub entity: EntityKind,
    #[serde(default)]
    pub mapping_override: Option<BTreeMap<String, String>>,
}

/// Request payload for the confirm endpoint. Contains the session to commit,
/// an optional mapping override, and an optional per-file deadline in
/// seconds after which remaining rows are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub session_id: String,
    #[serde(default)]
    pub mapping_override: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Request payload for the rollback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub batch_id: String,
}

/// Request payload for discarding an unconfirmed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardRequest {
    pub session_id: String,
}
