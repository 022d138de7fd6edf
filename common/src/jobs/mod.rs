use serde::{Deserialize, Serialize};

/// Status of a background import job, polled by clients.
///
/// `InProgress` carries a 0-100 progress percentage. `Completed` carries the
/// job's serialized result payload (for a confirm job, a JSON
/// `ConfirmReport`). `Failed` carries the error message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress(u32),
    Completed(String),
    Failed(String),
}
