use serde::{Deserialize, Serialize};

/// The three record types the importer knows how to migrate.
///
/// Import order across a full migration is fixed: contacts first, then jobs,
/// then invoices, because jobs resolve their owning contact and invoices
/// resolve both a contact and a job by natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Contact,
    Job,
    Invoice,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Contact => "contact",
            EntityKind::Job => "job",
            EntityKind::Invoice => "invoice",
        }
    }

    pub fn parse(value: &str) -> Option<EntityKind> {
        match value {
            "contact" | "contacts" => Some(EntityKind::Contact),
            "job" | "jobs" => Some(EntityKind::Job),
            "invoice" | "invoices" => Some(EntityKind::Invoice),
            _ => None,
        }
    }
}

/// How a canonical field's raw cell values are coerced.
///
/// Computed once per field from its name so that per-row normalization is a
/// table dispatch, not repeated string-suffix tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Date,
    Money,
    Phone,
    Email,
    Status,
    Tags,
    Text,
}

/// One canonical field: its name, whether validation requires it, and its
/// coercion kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

const fn field(name: &'static str, required: bool, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        required,
        kind,
    }
}

const CONTACT_FIELDS: &[FieldSpec] = &[
    field("first_name", true, FieldKind::Text),
    field("last_name", true, FieldKind::Text),
    field("email", false, FieldKind::Email),
    field("phone", false, FieldKind::Phone),
    field("company", false, FieldKind::Text),
    field("address", false, FieldKind::Text),
    field("city", false, FieldKind::Text),
    field("state", false, FieldKind::Text),
    field("zip", false, FieldKind::Text),
    field("status", false, FieldKind::Status),
    field("notes", false, FieldKind::Text),
    field("tags", false, FieldKind::Tags),
    field("created_at", false, FieldKind::Date),
];

const JOB_FIELDS: &[FieldSpec] = &[
    field("title", true, FieldKind::Text),
    field("description", false, FieldKind::Text),
    field("status", false, FieldKind::Status),
    field("value", false, FieldKind::Money),
    field("contact_email", false, FieldKind::Email),
    field("contact_name", false, FieldKind::Text),
    field("scheduled_date", false, FieldKind::Date),
    field("completed_date", false, FieldKind::Date),
    field("notes", false, FieldKind::Text),
    field("created_at", false, FieldKind::Date),
];

const INVOICE_FIELDS: &[FieldSpec] = &[
    field("invoice_number", false, FieldKind::Text),
    field("amount", true, FieldKind::Money),
    field("paid_amount", false, FieldKind::Money),
    field("status", false, FieldKind::Status),
    field("contact_email", false, FieldKind::Email),
    field("contact_name", false, FieldKind::Text),
    field("job_title", false, FieldKind::Text),
    field("issued_date", false, FieldKind::Date),
    field("due_date", false, FieldKind::Date),
    field("paid_date", false, FieldKind::Date),
    field("notes", false, FieldKind::Text),
];

/// The canonical field set for an entity, in declaration order.
pub fn canonical_fields(entity: EntityKind) -> &'static [FieldSpec] {
    match entity {
        EntityKind::Contact => CONTACT_FIELDS,
        EntityKind::Job => JOB_FIELDS,
        EntityKind::Invoice => INVOICE_FIELDS,
    }
}

/// The required field names for an entity, used by the validator.
pub fn required_fields(entity: EntityKind) -> Vec<&'static str> {
    canonical_fields(entity)
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name)
        .collect()
}
