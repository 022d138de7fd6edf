//! Dependency-Ordered Importer: persists one entity's valid rows.
//!
//! The caller owns the entity-level ordering (contacts, then jobs, then
//! invoices) across a full migration; each call here only guarantees
//! correctness within the row set it is given. Every row's upsert is
//! independent: a failure is recorded and the pass moves on, so one bad row
//! never aborts the batch.

use std::time::Instant;

use log::warn;

use common::model::cell::{field_str, NormalizedRow};
use common::model::entity::EntityKind;
use common::model::import::{ImportOutcome, RowError};
use common::model::validation::ValidRow;

use crate::migration::error::MigrationError;
use crate::migration::store::{MigrationStore, Persisted, Provenance};

/// Everything one import pass needs besides the rows.
pub struct ImportContext<'a> {
    pub batch_id: &'a str,
    pub source_system: &'a str,
    /// Optional external cutoff; once passed, remaining rows are skipped
    /// (in-flight writes are never interrupted) and the outcome reports a
    /// partial result.
    pub deadline: Option<Instant>,
}

/// Resolves the contact a job/invoice row points at: exact email lookup
/// first, then a case-insensitive first-name / rest-as-last-name match.
/// No match on either path leaves the reference null; the row still imports.
fn resolve_contact_ref(
    store: &MigrationStore,
    row: &NormalizedRow,
) -> Result<Option<String>, rusqlite::Error> {
    if let Some(email) = field_str(row, "contact_email") {
        if let Some(id) = store.resolve_contact_by_email(email)? {
            return Ok(Some(id));
        }
    }
    if let Some(name) = field_str(row, "contact_name") {
        let name = name.trim();
        if !name.is_empty() {
            let (first, rest) = match name.split_once(char::is_whitespace) {
                Some((first, rest)) => (first, rest.trim()),
                None => (name, ""),
            };
            if let Some(id) = store.resolve_contact_by_name(first, rest)? {
                return Ok(Some(id));
            }
        }
    }
    Ok(None)
}

fn persist_row(
    store: &MigrationStore,
    entity: EntityKind,
    row: &NormalizedRow,
    prov: &Provenance<'_>,
) -> Result<Persisted, rusqlite::Error> {
    match entity {
        EntityKind::Contact => store.upsert_contact(row, prov),
        EntityKind::Job => {
            let contact_id = resolve_contact_ref(store, row)?;
            store.upsert_job(row, contact_id.as_deref(), prov)
        }
        EntityKind::Invoice => {
            let contact_id = resolve_contact_ref(store, row)?;
            let job_id = match (contact_id.as_deref(), field_str(row, "job_title")) {
                (Some(cid), Some(title)) => store.resolve_job(title, Some(cid))?,
                _ => None,
            };
            store.upsert_invoice(row, contact_id.as_deref(), job_id.as_deref(), prov)
        }
    }
}

/// Imports one entity's rows under the given batch id. The batch ledger row
/// is minted together with the first successful insert, so a confirm that
/// inserts nothing records no batch. `progress` is called after every
/// processed row with (done, total).
pub fn import_rows<F>(
    store: &MigrationStore,
    entity: EntityKind,
    rows: &[ValidRow],
    ctx: &ImportContext<'_>,
    mut progress: F,
) -> Result<ImportOutcome, MigrationError>
where
    F: FnMut(usize, usize),
{
    let imported_at = MigrationStore::now();
    let prov = Provenance {
        batch_id: ctx.batch_id,
        source_system: ctx.source_system,
        imported_at: &imported_at,
    };

    let mut outcome = ImportOutcome::default();
    let mut batch_recorded = false;
    let total = rows.len();

    for (done, valid) in rows.iter().enumerate() {
        if let Some(deadline) = ctx.deadline {
            if Instant::now() >= deadline {
                outcome.deadline_hit = true;
                warn!(
                    "import deadline hit after {} of {} rows (batch {})",
                    done, total, ctx.batch_id
                );
                break;
            }
        }

        match persist_row(store, entity, &valid.row, &prov) {
            Ok(persisted) => {
                if !batch_recorded {
                    if let Persisted::Inserted(_) = persisted {
                        store.record_batch(ctx.batch_id, entity, ctx.source_system)?;
                        batch_recorded = true;
                    }
                }
                outcome.inserted_count += 1;
            }
            Err(e) => {
                outcome.errors.push(RowError {
                    row_index: valid.row_index,
                    error: e.to_string(),
                });
            }
        }
        progress(done + 1, total);
    }

    if batch_recorded {
        store.finish_batch(ctx.batch_id, outcome.inserted_count)?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::cell::CellValue;

    fn store() -> MigrationStore {
        let store = MigrationStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    fn ctx<'a>(batch_id: &'a str) -> ImportContext<'a> {
        ImportContext {
            batch_id,
            source_system: "generic_csv",
            deadline: None,
        }
    }

    fn valid(row_index: usize, pairs: &[(&str, CellValue)]) -> ValidRow {
        let mut row = NormalizedRow::new();
        for (name, value) in pairs {
            row.insert(name.to_string(), value.clone());
        }
        ValidRow { row_index, row }
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn contact(row_index: usize, first: &str, last: &str, email: &str) -> ValidRow {
        valid(
            row_index,
            &[
                ("first_name", text(first)),
                ("last_name", text(last)),
                ("email", text(email)),
            ],
        )
    }

    #[test]
    fn import_twice_is_idempotent() {
        let store = store();
        let rows = vec![
            contact(2, "Jane", "Doe", "jane@example.com"),
            contact(3, "Bob", "Lee", "bob@example.com"),
        ];

        let first = import_rows(&store, EntityKind::Contact, &rows, &ctx("b1"), |_, _| {}).unwrap();
        assert_eq!(first.inserted_count, 2);
        assert!(first.errors.is_empty());

        let second = import_rows(&store, EntityKind::Contact, &rows, &ctx("b2"), |_, _| {}).unwrap();
        assert_eq!(second.inserted_count, 2);
        assert_eq!(store.count(EntityKind::Contact).unwrap(), 2);
        // second pass only updated, so batch b2 owns no records
        assert_eq!(store.count_batch(EntityKind::Contact, "b2").unwrap(), 0);
    }

    #[test]
    fn job_resolves_contact_by_email_then_name() {
        let store = store();
        let contacts = vec![
            contact(2, "Jane", "Doe", "jane@example.com"),
            contact(3, "Bob", "Van Der Berg", "bob@example.com"),
        ];
        import_rows(&store, EntityKind::Contact, &contacts, &ctx("b1"), |_, _| {}).unwrap();

        let jobs = vec![
            valid(2, &[("title", text("Roof repair")), ("contact_email", text("jane@example.com"))]),
            // no email match; falls back to the split-name path
            valid(3, &[("title", text("Gutter install")), ("contact_name", text("bob van der berg"))]),
            valid(4, &[("title", text("Orphan job")), ("contact_email", text("nobody@example.com"))]),
        ];
        let outcome = import_rows(&store, EntityKind::Job, &jobs, &ctx("b2"), |_, _| {}).unwrap();
        assert_eq!(outcome.inserted_count, 3);
        assert_eq!(store.count(EntityKind::Job).unwrap(), 3);

        let jane = store.resolve_contact_by_email("jane@example.com").unwrap().unwrap();
        let bob = store.resolve_contact_by_email("bob@example.com").unwrap().unwrap();
        assert!(store.resolve_job("Roof repair", Some(&jane)).unwrap().is_some());
        assert!(store.resolve_job("Gutter install", Some(&bob)).unwrap().is_some());
        // the orphan kept a null contact reference but still imported
        assert!(store.resolve_job("Orphan job", None).unwrap().is_some());
    }

    #[test]
    fn partial_failure_isolation() {
        let store = store();
        // middle row violates jobs.title NOT NULL and must fail alone
        let rows = vec![
            valid(2, &[("title", text("Job A"))]),
            valid(3, &[("status", text("active"))]),
            valid(4, &[("title", text("Job C"))]),
        ];
        let outcome = import_rows(&store, EntityKind::Job, &rows, &ctx("b1"), |_, _| {}).unwrap();
        assert_eq!(outcome.inserted_count, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row_index, 3);
        assert_eq!(store.count(EntityKind::Job).unwrap(), 2);
    }

    #[test]
    fn zero_inserts_records_no_batch() {
        let store = store();
        let rows = vec![contact(2, "Jane", "Doe", "jane@example.com")];
        import_rows(&store, EntityKind::Contact, &rows, &ctx("b1"), |_, _| {}).unwrap();
        // re-run under a new batch: updates only
        import_rows(&store, EntityKind::Contact, &rows, &ctx("b2"), |_, _| {}).unwrap();
        assert_eq!(store.count_batch(EntityKind::Contact, "b2").unwrap(), 0);
    }

    #[test]
    fn expired_deadline_reports_partial_result() {
        let store = store();
        let rows = vec![
            contact(2, "Jane", "Doe", "jane@example.com"),
            contact(3, "Bob", "Lee", "bob@example.com"),
        ];
        let ctx = ImportContext {
            batch_id: "b1",
            source_system: "generic_csv",
            deadline: Some(Instant::now()),
        };
        let outcome = import_rows(&store, EntityKind::Contact, &rows, &ctx, |_, _| {}).unwrap();
        assert!(outcome.deadline_hit);
        assert_eq!(outcome.inserted_count, 0);
    }

    #[test]
    fn invoice_resolves_job_through_contact() {
        let store = store();
        import_rows(
            &store,
            EntityKind::Contact,
            &[contact(2, "Jane", "Doe", "jane@example.com")],
            &ctx("b1"),
            |_, _| {},
        )
        .unwrap();
        import_rows(
            &store,
            EntityKind::Job,
            &[valid(2, &[("title", text("Roof repair")), ("contact_email", text("jane@example.com"))])],
            &ctx("b2"),
            |_, _| {},
        )
        .unwrap();

        let invoices = vec![valid(
            2,
            &[
                ("invoice_number", text("INV-1")),
                ("amount", CellValue::Number(500.0)),
                ("contact_email", text("jane@example.com")),
                ("job_title", text("Roof repair")),
            ],
        )];
        let outcome =
            import_rows(&store, EntityKind::Invoice, &invoices, &ctx("b3"), |_, _| {}).unwrap();
        assert_eq!(outcome.inserted_count, 1);
        assert_eq!(store.count_batch(EntityKind::Invoice, "b3").unwrap(), 1);
    }
}
