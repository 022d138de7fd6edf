//! Manages the state of long-running, asynchronous background jobs.
//!
//! Confirmed imports run outside the request/response cycle: the confirm
//! endpoint registers a job, spawns the import, and returns a job id the
//! client polls. Workers report progress through an MPSC channel; the
//! updater task below folds those messages into the shared status map.

use std::{collections::HashMap, sync::Arc};

use common::jobs::JobStatus;
use tokio::sync::{mpsc, RwLock};

/// A thread-safe, shareable container for the state of all background jobs.
///
/// Created in `main.rs` and injected into the Actix application state as
/// `web::Data`. Reads come from the status endpoint; writes come from the
/// `start_job_updater` task.
#[derive(Clone)]
pub struct JobsState {
    /// Job id -> current status. The single source of truth for all jobs.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Sender half used by background workers to push status changes
    /// without needing direct write access to the map.
    pub tx: mpsc::Sender<JobUpdate>,
}

/// A status change for one background job.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: String, status: JobStatus) -> JobUpdate {
        JobUpdate { job_id, status }
    }
}

/// Long-running task that applies `JobUpdate` messages to the shared map.
/// Spawned once from `main.rs`.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id.clone(), update.status);
    }
}
