//! Lists the source CRMs the alias catalog knows how to map. Pure catalog
//! read; no pipeline logic.

use actix_web::web::{get, scope};
use actix_web::{web, HttpResponse, Responder, Scope};

use crate::migration::catalog::AliasCatalog;

const API_PATH: &str = "/api/source_systems";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("", get().to(process))
}

pub(crate) async fn process(catalog: web::Data<AliasCatalog>) -> impl Responder {
    HttpResponse::Ok().json(catalog.source_systems())
}
