//! Runtime configuration, read once at startup from the environment.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// The tenant database this process serves. Routing a tenant to its
    /// database is the caller's concern; the engine just uses the handle.
    pub db_path: PathBuf,
    /// Where staged session CSVs live until confirm or discard.
    pub upload_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> AppConfig {
        let host = env::var("MIGRATE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("MIGRATE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let db_path = env::var("MIGRATE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("crm_import.sqlite"));
        let upload_dir = env::var("MIGRATE_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("crm_import_uploads"));
        AppConfig {
            host,
            port,
            db_path,
            upload_dir,
        }
    }
}
