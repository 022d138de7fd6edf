use serde::{Deserialize, Serialize};

/// Catalog metadata for one supported source CRM, as listed to clients.
///
/// `export_instructions` tells the user how to pull the CSV export out of
/// that CRM; `has_direct_api` flags systems a future live import could talk
/// to directly (batch file import is the only path implemented here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSystemInfo {
    pub key: String,
    pub display_name: String,
    pub has_direct_api: bool,
    pub export_instructions: String,
}
