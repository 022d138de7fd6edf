//! Confirm endpoint: commits a previewed session as a background job.
//!
//! The handler registers the job and returns its id immediately; the import
//! itself runs on a blocking thread (rusqlite and file I/O are synchronous)
//! while a listener task translates per-row progress into percentage
//! updates for the central job controller. The final `Completed` status
//! carries the serialized `ConfirmReport`.

use std::time::{Duration, Instant};

use actix_web::{web, HttpResponse, Responder};
use tokio::sync::mpsc;
use uuid::Uuid;

use common::jobs::JobStatus;
use common::model::import::ConfirmReport;
use common::model::mapping::ColumnMapping;
use common::requests::ConfirmRequest;

use crate::config::AppConfig;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::migration::error::MigrationError;
use crate::migration::import::{import_rows, ImportContext};
use crate::migration::pipeline_with_mapping;
use crate::migration::session::{discard_session, load_session};
use crate::migration::store::MigrationStore;

use super::SAMPLE_LIMIT;

/// Per-row progress from the blocking import thread.
#[derive(Debug)]
struct ImportProgress {
    done: usize,
    total: usize,
}

pub(crate) async fn process(
    state: web::Data<JobsState>,
    config: web::Data<AppConfig>,
    payload: web::Json<ConfirmRequest>,
) -> impl Responder {
    let job_id = schedule_import_job(state, config, payload.into_inner()).await;
    HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id }))
}

/// Registers the job as `Pending`, spawns the worker, and returns the job
/// id for status polling.
async fn schedule_import_job(
    state: web::Data<JobsState>,
    config: web::Data<AppConfig>,
    req: ConfirmRequest,
) -> String {
    let job_id = Uuid::new_v4().to_string();
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);

    let tx = state.tx.clone();
    let job_id_clone = job_id.clone();
    let config = config.get_ref().clone();

    tokio::spawn(async move {
        // Dedicated channel for this job's row progress.
        let (progress_tx, mut progress_rx) = mpsc::channel::<ImportProgress>(100);

        let updater_tx = tx.clone();
        let job_id_for_updater = job_id_clone.clone();
        tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                let percent = if progress.total > 0 {
                    (progress.done as f32 / progress.total as f32 * 100.0) as u32
                } else {
                    100
                };
                let _ = updater_tx
                    .send(JobUpdate::new(
                        job_id_for_updater.clone(),
                        JobStatus::InProgress(percent),
                    ))
                    .await;
            }
        });

        let handle =
            tokio::task::spawn_blocking(move || confirm_blocking(&config, &req, progress_tx));

        let status = match handle.await {
            Ok(Ok(report)) => match serde_json::to_string(&report) {
                Ok(payload) => JobStatus::Completed(payload),
                Err(e) => JobStatus::Failed(format!("Report serialization failed: {e}")),
            },
            Ok(Err(e)) => JobStatus::Failed(e.to_string()),
            Err(join_err) => JobStatus::Failed(format!("Task join error: {join_err}")),
        };
        let _ = tx.send(JobUpdate::new(job_id_clone, status)).await;
    });

    job_id
}

/// The synchronous confirm path: load the session, re-run the pipeline with
/// the stored mapping (or a fresh override), import the valid rows under a
/// new batch id, and consume the session.
fn confirm_blocking(
    config: &AppConfig,
    req: &ConfirmRequest,
    progress_tx: mpsc::Sender<ImportProgress>,
) -> Result<ConfirmReport, MigrationError> {
    let store = MigrationStore::open(&config.db_path)?;
    let (session, bytes) = load_session(&store, &config.upload_dir, &req.session_id)?;

    let mapping = match &req.mapping_override {
        Some(manual) => ColumnMapping::from_override(manual.clone()),
        None => session.mapping.clone(),
    };
    let data = pipeline_with_mapping(mapping, session.entity, &bytes)?;

    let batch_id = Uuid::new_v4().to_string();
    let ctx = ImportContext {
        batch_id: &batch_id,
        source_system: &session.source_system,
        deadline: req
            .timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs)),
    };

    let outcome = import_rows(&store, session.entity, &data.outcome.valid, &ctx, |done, total| {
        let _ = progress_tx.blocking_send(ImportProgress { done, total });
    })?;

    // The session is spent; its staged file goes with it.
    discard_session(&store, &config.upload_dir, &req.session_id)?;

    Ok(ConfirmReport {
        batch_id,
        entity: session.entity,
        inserted_count: outcome.inserted_count,
        error_count: outcome.errors.len(),
        sample_errors: outcome.errors.into_iter().take(SAMPLE_LIMIT).collect(),
        deadline_hit: outcome.deadline_hit,
    })
}
