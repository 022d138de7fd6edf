use actix_web::{web, HttpResponse, Responder};

use common::requests::DiscardRequest;

use crate::config::AppConfig;
use crate::migration::session::discard_session;
use crate::migration::store::MigrationStore;

use super::error_response;

/// Drops an unconfirmed session: staged file first, then the session row.
pub(crate) async fn process(
    config: web::Data<AppConfig>,
    payload: web::Json<DiscardRequest>,
) -> impl Responder {
    let result = MigrationStore::open(&config.db_path)
        .map_err(Into::into)
        .and_then(|store| discard_session(&store, &config.upload_dir, &payload.session_id));
    match result {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => error_response(&e),
    }
}
