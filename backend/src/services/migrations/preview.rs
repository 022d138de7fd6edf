use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use futures_util::StreamExt;
use serde_json::from_slice;

use common::model::preview::{PreviewResponse, PreviewSummary};
use common::requests::PreviewMeta;

use crate::config::AppConfig;
use crate::migration::catalog::AliasCatalog;
use crate::migration::error::MigrationError;
use crate::migration::session::create_session;
use crate::migration::store::MigrationStore;
use crate::migration::{preview_rows, PreviewData};

use super::{error_response, SAMPLE_LIMIT};

/// HTTP handler wrapper that converts the internal result to an
/// `HttpResponse`.
pub(crate) async fn process(
    config: web::Data<AppConfig>,
    catalog: web::Data<AliasCatalog>,
    payload: Multipart,
) -> impl Responder {
    match run_preview(&config, &catalog, payload).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(PreviewError::Engine(e)) => error_response(&e),
        Err(PreviewError::Upload(msg)) => HttpResponse::BadRequest().body(format!("Error: {msg}")),
    }
}

enum PreviewError {
    /// The multipart request itself was malformed.
    Upload(String),
    Engine(MigrationError),
}

impl From<MigrationError> for PreviewError {
    fn from(e: MigrationError) -> Self {
        PreviewError::Engine(e)
    }
}

/// Accepts the two-part upload (a `json` metadata part followed by the CSV
/// `file` part), runs the map -> normalize -> validate pipeline, and stages
/// a session for a later confirm.
async fn run_preview(
    config: &AppConfig,
    catalog: &AliasCatalog,
    mut payload: Multipart,
) -> Result<PreviewResponse, PreviewError> {
    let mut meta: Option<PreviewMeta> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| PreviewError::Upload(e.to_string()))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match name.as_deref() {
            Some("json") => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(|e| PreviewError::Upload(e.to_string()))?;
                    bytes.extend_from_slice(&chunk);
                }
                let parsed: PreviewMeta =
                    from_slice(&bytes).map_err(|e| PreviewError::Upload(e.to_string()))?;
                meta = Some(parsed);
            }
            Some("file") => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();
                if !filename.ends_with(".csv") {
                    return Err(PreviewError::Upload("The file must end with .csv".into()));
                }
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(|e| PreviewError::Upload(e.to_string()))?;
                    bytes.extend_from_slice(&chunk);
                }
                file_bytes = Some(bytes);
            }
            _ => {}
        }
    }

    let meta = meta.ok_or_else(|| PreviewError::Upload("Missing json metadata part".into()))?;
    let bytes = file_bytes.ok_or_else(|| PreviewError::Upload("Missing file part".into()))?;

    let data = preview_rows(
        catalog,
        &meta.source_system,
        meta.entity,
        &bytes,
        meta.mapping_override,
    )?;

    let store = MigrationStore::open(&config.db_path).map_err(MigrationError::from)?;
    let session_id = create_session(
        &store,
        &config.upload_dir,
        &meta.source_system,
        meta.entity,
        &data.mapping,
        &bytes,
    )?;

    Ok(build_response(session_id, data))
}

fn build_response(session_id: String, data: PreviewData) -> PreviewResponse {
    let PreviewData {
        mapping,
        outcome,
        total_rows,
    } = data;

    let summary = PreviewSummary {
        total_rows,
        valid_rows: outcome.valid.len(),
        error_rows: outcome.invalid.len(),
        unmapped_fields: mapping.unmapped_fields.clone(),
        unclaimed_columns: mapping.unclaimed_columns.clone(),
    };

    PreviewResponse {
        session_id,
        mapping,
        summary,
        sample_rows: outcome.valid.into_iter().take(SAMPLE_LIMIT).collect(),
        sample_errors: outcome.invalid.into_iter().take(SAMPLE_LIMIT).collect(),
    }
}
