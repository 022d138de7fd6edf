//! Tenant data store over SQLite.
//!
//! One store handle wraps one tenant database. The importer talks to it
//! through natural-key upserts and explicit resolve lookups; rollback talks
//! to it through delete-by-batch. Per-row consistency relies on SQLite's
//! statement atomicity; the engine holds no lock across rows.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use common::model::cell::{field_f64, field_str, NormalizedRow};
use common::model::entity::EntityKind;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contacts (
    id              TEXT PRIMARY KEY,
    first_name      TEXT,
    last_name       TEXT,
    email           TEXT,
    phone           TEXT,
    company         TEXT,
    address         TEXT,
    city            TEXT,
    state           TEXT,
    zip             TEXT,
    status          TEXT,
    notes           TEXT,
    tags            TEXT,
    created_at      TEXT,
    source_system   TEXT,
    imported_at     TEXT,
    import_batch_id TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_email
    ON contacts(email) WHERE email IS NOT NULL;

CREATE TABLE IF NOT EXISTS jobs (
    id              TEXT PRIMARY KEY,
    contact_id      TEXT,
    title           TEXT NOT NULL,
    description     TEXT,
    status          TEXT,
    value           REAL,
    scheduled_date  TEXT,
    completed_date  TEXT,
    notes           TEXT,
    created_at      TEXT,
    source_system   TEXT,
    imported_at     TEXT,
    import_batch_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_jobs_title ON jobs(title);

CREATE TABLE IF NOT EXISTS invoices (
    id              TEXT PRIMARY KEY,
    invoice_number  TEXT,
    contact_id      TEXT,
    job_id          TEXT,
    amount          REAL,
    paid_amount     REAL,
    status          TEXT,
    issued_date     TEXT,
    due_date        TEXT,
    paid_date       TEXT,
    notes           TEXT,
    source_system   TEXT,
    imported_at     TEXT,
    import_batch_id TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_invoices_number
    ON invoices(invoice_number) WHERE invoice_number IS NOT NULL;

CREATE TABLE IF NOT EXISTS migration_sessions (
    id            TEXT PRIMARY KEY,
    source_system TEXT NOT NULL,
    entity        TEXT NOT NULL,
    mapping_json  TEXT NOT NULL,
    file_md5      TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS migration_batches (
    id             TEXT PRIMARY KEY,
    entity         TEXT NOT NULL,
    source_system  TEXT NOT NULL,
    inserted_count INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);
";

/// What an upsert did, so the importer can count and mint the batch ledger
/// row on the first insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted {
    Inserted(String),
    Updated(String),
}

impl Persisted {
    pub fn id(&self) -> &str {
        match self {
            Persisted::Inserted(id) | Persisted::Updated(id) => id,
        }
    }
}

/// Import provenance stamped onto every inserted record.
#[derive(Debug, Clone)]
pub struct Provenance<'a> {
    pub batch_id: &'a str,
    pub source_system: &'a str,
    pub imported_at: &'a str,
}

pub struct MigrationStore {
    conn: Connection,
}

impl MigrationStore {
    pub fn open(path: &Path) -> Result<MigrationStore, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Ok(MigrationStore { conn })
    }

    pub fn open_in_memory() -> Result<MigrationStore, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Ok(MigrationStore { conn })
    }

    pub fn init_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(SCHEMA)
    }

    pub fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    // --- resolvers -------------------------------------------------------

    /// Exact lookup; stored emails are already lowercased by normalization.
    pub fn resolve_contact_by_email(&self, email: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id FROM contacts WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()
    }

    /// Case-insensitive lookup on both name parts.
    pub fn resolve_contact_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id FROM contacts
                 WHERE LOWER(first_name) = LOWER(?1) AND LOWER(last_name) = LOWER(?2)",
                params![first_name, last_name],
                |row| row.get(0),
            )
            .optional()
    }

    /// Natural-key job lookup: (title, owning contact). `IS` keeps NULL
    /// contact references comparable.
    pub fn resolve_job(
        &self,
        title: &str,
        contact_id: Option<&str>,
    ) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id FROM jobs WHERE title = ?1 AND contact_id IS ?2",
                params![title, contact_id],
                |row| row.get(0),
            )
            .optional()
    }

    // --- upserts ---------------------------------------------------------

    /// Contact upsert keyed on email. On conflict, name fields overwrite
    /// unconditionally; every secondary field only overwrites when the
    /// incoming value is non-null, so a re-import never blanks existing
    /// data. A contact without an email is always inserted fresh.
    pub fn upsert_contact(
        &self,
        row: &NormalizedRow,
        prov: &Provenance<'_>,
    ) -> Result<Persisted, rusqlite::Error> {
        let email = field_str(row, "email");
        let existing = match email {
            Some(e) => self.resolve_contact_by_email(e)?,
            None => None,
        };

        if let Some(id) = existing {
            self.conn.execute(
                "UPDATE contacts SET
                     first_name = ?1,
                     last_name  = ?2,
                     phone      = COALESCE(?3, phone),
                     company    = COALESCE(?4, company),
                     address    = COALESCE(?5, address),
                     city       = COALESCE(?6, city),
                     state      = COALESCE(?7, state),
                     zip        = COALESCE(?8, zip),
                     status     = COALESCE(?9, status),
                     notes      = COALESCE(?10, notes),
                     tags       = COALESCE(?11, tags)
                 WHERE id = ?12",
                params![
                    field_str(row, "first_name"),
                    field_str(row, "last_name"),
                    field_str(row, "phone"),
                    field_str(row, "company"),
                    field_str(row, "address"),
                    field_str(row, "city"),
                    field_str(row, "state"),
                    field_str(row, "zip"),
                    field_str(row, "status"),
                    field_str(row, "notes"),
                    field_str(row, "tags"),
                    id,
                ],
            )?;
            return Ok(Persisted::Updated(id));
        }

        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO contacts (
                 id, first_name, last_name, email, phone, company,
                 address, city, state, zip, status, notes, tags, created_at,
                 source_system, imported_at, import_batch_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                id,
                field_str(row, "first_name"),
                field_str(row, "last_name"),
                email,
                field_str(row, "phone"),
                field_str(row, "company"),
                field_str(row, "address"),
                field_str(row, "city"),
                field_str(row, "state"),
                field_str(row, "zip"),
                field_str(row, "status"),
                field_str(row, "notes"),
                field_str(row, "tags"),
                field_str(row, "created_at"),
                prov.source_system,
                prov.imported_at,
                prov.batch_id,
            ],
        )?;
        Ok(Persisted::Inserted(id))
    }

    /// Job upsert keyed on (title, resolved contact). On conflict, status
    /// overwrites unconditionally; value, dates, and notes only when
    /// incoming is non-null.
    pub fn upsert_job(
        &self,
        row: &NormalizedRow,
        contact_id: Option<&str>,
        prov: &Provenance<'_>,
    ) -> Result<Persisted, rusqlite::Error> {
        let title = field_str(row, "title");
        let existing = match title {
            Some(t) => self.resolve_job(t, contact_id)?,
            None => None,
        };

        if let Some(id) = existing {
            self.conn.execute(
                "UPDATE jobs SET
                     status         = ?1,
                     description    = COALESCE(?2, description),
                     value          = COALESCE(?3, value),
                     scheduled_date = COALESCE(?4, scheduled_date),
                     completed_date = COALESCE(?5, completed_date),
                     notes          = COALESCE(?6, notes)
                 WHERE id = ?7",
                params![
                    field_str(row, "status"),
                    field_str(row, "description"),
                    field_f64(row, "value"),
                    field_str(row, "scheduled_date"),
                    field_str(row, "completed_date"),
                    field_str(row, "notes"),
                    id,
                ],
            )?;
            return Ok(Persisted::Updated(id));
        }

        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO jobs (
                 id, contact_id, title, description, status, value,
                 scheduled_date, completed_date, notes, created_at,
                 source_system, imported_at, import_batch_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                contact_id,
                title,
                field_str(row, "description"),
                field_str(row, "status"),
                field_f64(row, "value"),
                field_str(row, "scheduled_date"),
                field_str(row, "completed_date"),
                field_str(row, "notes"),
                field_str(row, "created_at"),
                prov.source_system,
                prov.imported_at,
                prov.batch_id,
            ],
        )?;
        Ok(Persisted::Inserted(id))
    }

    /// Invoice upsert keyed on invoice number. On conflict, status
    /// overwrites unconditionally; paid_amount and paid_date only when
    /// incoming is non-null. An invoice without a number is always inserted.
    pub fn upsert_invoice(
        &self,
        row: &NormalizedRow,
        contact_id: Option<&str>,
        job_id: Option<&str>,
        prov: &Provenance<'_>,
    ) -> Result<Persisted, rusqlite::Error> {
        let number = field_str(row, "invoice_number");
        let existing = match number {
            Some(n) => self
                .conn
                .query_row(
                    "SELECT id FROM invoices WHERE invoice_number = ?1",
                    params![n],
                    |r| r.get::<_, String>(0),
                )
                .optional()?,
            None => None,
        };

        if let Some(id) = existing {
            self.conn.execute(
                "UPDATE invoices SET
                     status      = ?1,
                     paid_amount = COALESCE(?2, paid_amount),
                     paid_date   = COALESCE(?3, paid_date)
                 WHERE id = ?4",
                params![
                    field_str(row, "status"),
                    field_f64(row, "paid_amount"),
                    field_str(row, "paid_date"),
                    id,
                ],
            )?;
            return Ok(Persisted::Updated(id));
        }

        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO invoices (
                 id, invoice_number, contact_id, job_id, amount, paid_amount,
                 status, issued_date, due_date, paid_date, notes,
                 source_system, imported_at, import_batch_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id,
                number,
                contact_id,
                job_id,
                field_f64(row, "amount"),
                field_f64(row, "paid_amount"),
                field_str(row, "status"),
                field_str(row, "issued_date"),
                field_str(row, "due_date"),
                field_str(row, "paid_date"),
                field_str(row, "notes"),
                prov.source_system,
                prov.imported_at,
                prov.batch_id,
            ],
        )?;
        Ok(Persisted::Inserted(id))
    }

    // --- batch ledger ----------------------------------------------------

    pub fn record_batch(
        &self,
        batch_id: &str,
        entity: EntityKind,
        source_system: &str,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR IGNORE INTO migration_batches (id, entity, source_system, inserted_count, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![batch_id, entity.as_str(), source_system, Self::now()],
        )?;
        Ok(())
    }

    pub fn finish_batch(&self, batch_id: &str, inserted_count: usize) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE migration_batches SET inserted_count = ?1 WHERE id = ?2",
            params![inserted_count as i64, batch_id],
        )?;
        Ok(())
    }

    /// Deletes every record of one entity table carrying the batch tag.
    /// Returns the number of rows removed; an unknown batch id removes zero.
    pub fn delete_batch(
        &self,
        entity: EntityKind,
        batch_id: &str,
    ) -> Result<usize, rusqlite::Error> {
        let table = match entity {
            EntityKind::Contact => "contacts",
            EntityKind::Job => "jobs",
            EntityKind::Invoice => "invoices",
        };
        self.conn.execute(
            &format!("DELETE FROM {table} WHERE import_batch_id = ?1"),
            params![batch_id],
        )
    }

    pub fn delete_batch_record(&self, batch_id: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "DELETE FROM migration_batches WHERE id = ?1",
            params![batch_id],
        )?;
        Ok(())
    }

    // --- sessions --------------------------------------------------------

    pub fn insert_session(
        &self,
        id: &str,
        source_system: &str,
        entity: EntityKind,
        mapping_json: &str,
        file_md5: &str,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO migration_sessions (id, source_system, entity, mapping_json, file_md5, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, source_system, entity.as_str(), mapping_json, file_md5, Self::now()],
        )?;
        Ok(())
    }

    pub fn get_session(
        &self,
        id: &str,
    ) -> Result<Option<(String, String, String, String, String)>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT source_system, entity, mapping_json, file_md5, created_at
                 FROM migration_sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()
    }

    pub fn delete_session(&self, id: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "DELETE FROM migration_sessions WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    // --- counts (used by tests and the rollback report) ------------------

    pub fn count(&self, entity: EntityKind) -> Result<i64, rusqlite::Error> {
        let table = match entity {
            EntityKind::Contact => "contacts",
            EntityKind::Job => "jobs",
            EntityKind::Invoice => "invoices",
        };
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
    }

    pub fn count_batch(
        &self,
        entity: EntityKind,
        batch_id: &str,
    ) -> Result<i64, rusqlite::Error> {
        let table = match entity {
            EntityKind::Contact => "contacts",
            EntityKind::Job => "jobs",
            EntityKind::Invoice => "invoices",
        };
        self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE import_batch_id = ?1"),
            params![batch_id],
            |row| row.get(0),
        )
    }
}
