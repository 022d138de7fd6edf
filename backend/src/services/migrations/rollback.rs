use actix_web::{web, HttpResponse, Responder};

use common::requests::RollbackRequest;

use crate::config::AppConfig;
use crate::migration::session::rollback_batch;
use crate::migration::store::MigrationStore;

/// Deletes everything a committed batch inserted. Idempotent: rolling back
/// an unknown or already-rolled-back batch id reports success with zero
/// deletions.
pub(crate) async fn process(
    config: web::Data<AppConfig>,
    payload: web::Json<RollbackRequest>,
) -> impl Responder {
    let store = match MigrationStore::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => return HttpResponse::InternalServerError().body(format!("Error: {e}")),
    };
    let report = rollback_batch(&store, &payload.batch_id);
    HttpResponse::Ok().json(report)
}
