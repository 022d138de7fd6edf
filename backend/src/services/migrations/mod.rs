//! HTTP surface of the migration engine.
//!
//! The provided routes are:
//! - `POST /api/migrations/preview`: multipart upload of a CSV export plus a
//!   `json` metadata part (source system, entity, optional manual mapping).
//!   Stages the file as a session and returns the computed column mapping,
//!   a valid/invalid summary, and sample rows.
//! - `POST /api/migrations/confirm`: commits a previewed session as a
//!   background job and immediately returns a `job_id`. The final job status
//!   carries the import report (batch id, inserted count, row errors).
//! - `GET /api/migrations/status/{job_id}`: polls a background job.
//! - `POST /api/migrations/rollback`: deletes everything a committed batch
//!   inserted, reverse dependency order, per-table results.
//! - `POST /api/migrations/discard`: drops an unconfirmed session and its
//!   staged file.

use actix_web::web::{get, post, scope};
use actix_web::{HttpResponse, Scope};

mod confirm;
mod discard;
mod get_status;
mod preview;
mod rollback;

use crate::migration::error::MigrationError;

const API_PATH: &str = "/api/migrations";

/// How many sample rows / sample errors a response carries.
const SAMPLE_LIMIT: usize = 5;

/// Configures and returns the Actix scope for migration routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/preview", post().to(preview::process))
        .route("/confirm", post().to(confirm::process))
        .route("/rollback", post().to(rollback::process))
        .route("/discard", post().to(discard::process))
        .route("/status/{job_id}", get().to(get_status::process))
}

/// Maps engine errors onto HTTP statuses. Fatal pipeline errors are client
/// problems; anything touching disk or the database is ours.
fn error_response(err: &MigrationError) -> HttpResponse {
    match err {
        MigrationError::UnknownSourceSystem(_) | MigrationError::EmptyInput => {
            HttpResponse::BadRequest().body(format!("Error: {err}"))
        }
        MigrationError::SessionExpired(_) => HttpResponse::Gone().body(format!("Error: {err}")),
        _ => HttpResponse::InternalServerError().body(format!("Error: {err}")),
    }
}
