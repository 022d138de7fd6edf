//! Migration sessions and the batch ledger.
//!
//! A session is the file-backed state of one uploaded-but-not-yet-confirmed
//! import: the staged CSV on disk plus a database row holding the
//! (source system, entity) pair, the computed column mapping, and an md5
//! fingerprint of the staged bytes. Confirm consumes the session; discard
//! deletes it. A session whose backing file is missing, whose bytes no
//! longer match the fingerprint, or whose age exceeds the retention window
//! fails closed with `SessionExpired`; it is never silently re-derived
//! from partial state.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use log::info;
use uuid::Uuid;

use common::model::entity::EntityKind;
use common::model::import::{RollbackReport, TableRollback};
use common::model::mapping::ColumnMapping;

use crate::migration::error::MigrationError;
use crate::migration::store::MigrationStore;

/// How long an unconfirmed session stays usable.
pub const SESSION_TTL_HOURS: i64 = 24;

/// One loaded session, ready for confirm.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: String,
    pub source_system: String,
    pub entity: EntityKind,
    pub mapping: ColumnMapping,
}

pub fn session_file_path(upload_dir: &Path, session_id: &str) -> PathBuf {
    upload_dir.join(format!("{session_id}.csv"))
}

/// Stages the uploaded bytes and records the session row. Returns the fresh
/// session id.
pub fn create_session(
    store: &MigrationStore,
    upload_dir: &Path,
    source_system: &str,
    entity: EntityKind,
    mapping: &ColumnMapping,
    bytes: &[u8],
) -> Result<String, MigrationError> {
    let session_id = Uuid::new_v4().to_string();
    let path = session_file_path(upload_dir, &session_id);
    fs::write(&path, bytes)?;

    let digest = format!("{:x}", md5::compute(bytes));
    let mapping_json = serde_json::to_string(mapping)?;
    store.insert_session(&session_id, source_system, entity, &mapping_json, &digest)?;
    info!("session {session_id} staged ({} bytes, {entity:?})", bytes.len());
    Ok(session_id)
}

/// Loads a session and its staged bytes, enforcing every expiry rule.
pub fn load_session(
    store: &MigrationStore,
    upload_dir: &Path,
    session_id: &str,
) -> Result<(SessionData, Vec<u8>), MigrationError> {
    let (source_system, entity, mapping_json, file_md5, created_at) = store
        .get_session(session_id)?
        .ok_or_else(|| MigrationError::SessionExpired(session_id.to_string()))?;

    let entity = EntityKind::parse(&entity)
        .ok_or_else(|| MigrationError::SessionExpired(session_id.to_string()))?;

    if session_age_exceeded(&created_at) {
        discard_session(store, upload_dir, session_id)?;
        return Err(MigrationError::SessionExpired(session_id.to_string()));
    }

    let path = session_file_path(upload_dir, session_id);
    if !path.exists() {
        return Err(MigrationError::SessionExpired(session_id.to_string()));
    }
    let bytes = fs::read(&path)?;
    if format!("{:x}", md5::compute(&bytes)) != file_md5 {
        return Err(MigrationError::SessionExpired(session_id.to_string()));
    }

    let mapping: ColumnMapping = serde_json::from_str(&mapping_json)?;
    Ok((
        SessionData {
            id: session_id.to_string(),
            source_system,
            entity,
            mapping,
        },
        bytes,
    ))
}

fn session_age_exceeded(created_at: &str) -> bool {
    match DateTime::parse_from_rfc3339(created_at) {
        Ok(created) => {
            Utc::now() - created.with_timezone(&Utc) > Duration::hours(SESSION_TTL_HOURS)
        }
        // unreadable timestamp: treat as expired rather than keep forever
        Err(_) => true,
    }
}

/// Removes a session's staged file and row. Safe to call for sessions that
/// are already partially gone.
pub fn discard_session(
    store: &MigrationStore,
    upload_dir: &Path,
    session_id: &str,
) -> Result<(), MigrationError> {
    let path = session_file_path(upload_dir, session_id);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    store.delete_session(session_id)?;
    Ok(())
}

/// Deletes everything a committed batch inserted, in reverse dependency
/// order (invoices, then jobs, then contacts) so no delete trips over a
/// dangling reference. Idempotent: an unknown or already-rolled-back batch
/// id succeeds with zero deletions. Per-table failures are reported
/// separately so a partial rollback is distinguishable from a total one.
pub fn rollback_batch(store: &MigrationStore, batch_id: &str) -> RollbackReport {
    let mut tables = Vec::new();
    for entity in [EntityKind::Invoice, EntityKind::Job, EntityKind::Contact] {
        match store.delete_batch(entity, batch_id) {
            Ok(deleted) => tables.push(TableRollback {
                entity,
                deleted,
                error: None,
            }),
            Err(e) => tables.push(TableRollback {
                entity,
                deleted: 0,
                error: Some(e.to_string()),
            }),
        }
    }

    let success = tables.iter().all(|t| t.error.is_none());
    if success {
        if let Err(e) = store.delete_batch_record(batch_id) {
            info!("batch ledger row for {batch_id} not removed: {e}");
        }
    }
    RollbackReport {
        batch_id: batch_id.to_string(),
        success,
        tables,
    }
}
