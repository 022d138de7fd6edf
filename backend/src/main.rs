mod config;
mod job_controller;
mod migration;
mod services;

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use tokio::sync::{mpsc, RwLock};

use crate::config::AppConfig;
use crate::job_controller::state::JobsState;
use crate::migration::catalog::AliasCatalog;
use crate::migration::store::MigrationStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let app_config = AppConfig::from_env();
    fs::create_dir_all(&app_config.upload_dir)?;

    let catalog = AliasCatalog::load().map_err(std::io::Error::other)?;
    info!(
        "alias catalog loaded: {} source systems",
        catalog.source_systems().len()
    );

    // One-time schema init; request handlers open their own connections.
    let store = MigrationStore::open(&app_config.db_path).map_err(std::io::Error::other)?;
    store.init_schema().map_err(std::io::Error::other)?;
    drop(store);

    // Initialize job controller state
    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState {
        jobs: Arc::new(RwLock::new(HashMap::new())),
        tx,
    };

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let bind = (app_config.host.clone(), app_config.port);
    info!("Server running at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::new(catalog.clone()))
            .service(services::migrations::configure_routes())
            .service(services::source_systems::configure_routes())
    })
    .bind(bind)?
    .run()
    .await
}
