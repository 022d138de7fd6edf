//! Row Normalizer: turns one raw CSV row into an entity-shaped record of
//! typed values, using the column mapping.
//!
//! Coercion is dispatched through the `FieldKind` computed once per canonical
//! field, instead of re-testing field-name suffixes on every row. Coercion
//! never fails a row: an unparsable date or amount becomes `Null`, and a
//! phone number with an unrecognized shape passes through unchanged.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use common::model::cell::{CellValue, NormalizedRow};
use common::model::entity::{canonical_fields, EntityKind, FieldKind};
use common::model::mapping::ColumnMapping;

/// One CSV data row as read from the file: source column name -> raw value.
/// Never mutated; it is the audit trail back to the literal input.
pub type RawRow = HashMap<String, String>;

/// Fixed status taxonomy, checked in this order. Matching is case-insensitive
/// substring containment: the first bucket any of whose variants occurs in
/// the raw value wins. A value matching no bucket passes through unchanged
/// (data fidelity beats taxonomy purity). Because this is substring matching,
/// a value containing variants of several buckets resolves to whichever
/// bucket is listed first; that tie-break is deliberate, and changing it
/// would change import outcomes for existing data.
const STATUS_BUCKETS: &[(&str, &[&str])] = &[
    ("lead", &["lead", "prospect", "potential", "opportunity"]),
    ("client", &["client", "customer", "existing"]),
    ("inactive", &["inactive", "archived", "dormant", "former"]),
    (
        "active",
        &["active", "in progress", "in-progress", "ongoing", "scheduled", "started"],
    ),
    (
        "completed",
        &["complete", "done", "closed won", "finished", "fulfilled"],
    ),
    (
        "cancelled",
        &["cancel", "closed lost", "lost", "void", "declined"],
    ),
    ("paid", &["paid", "payment received", "settled"]),
    ("sent", &["sent", "issued", "emailed", "invoiced"]),
    ("overdue", &["overdue", "past due", "late"]),
    ("draft", &["draft", "pending"]),
];

/// Normalizes one raw row. Fields absent from the mapping are absent from
/// the output; mapped fields with empty raw values become `Null`.
pub fn normalize_row(
    mapping: &ColumnMapping,
    entity: EntityKind,
    raw: &RawRow,
) -> NormalizedRow {
    let mut row = NormalizedRow::new();
    for field in canonical_fields(entity) {
        let source_column = match mapping.source_column(field.name) {
            Some(c) => c,
            None => continue,
        };
        let raw_value = raw.get(source_column).map(String::as_str).unwrap_or("");
        row.insert(field.name.to_string(), coerce(field.kind, raw_value));
    }
    row
}

/// Applies the per-kind coercion rule to a single raw cell.
pub fn coerce(kind: FieldKind, raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    match kind {
        FieldKind::Date => normalize_date(trimmed),
        FieldKind::Money => normalize_money(trimmed),
        FieldKind::Phone => CellValue::Text(normalize_phone(trimmed)),
        FieldKind::Email => CellValue::Text(trimmed.to_lowercase()),
        FieldKind::Status => CellValue::Text(normalize_status(trimmed)),
        FieldKind::Tags => normalize_tags(trimmed),
        FieldKind::Text => CellValue::Text(trimmed.to_string()),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Parses a calendar date/time in any of the accepted shapes and emits the
/// canonical RFC 3339 UTC form. Unparsable input becomes `Null`, never an
/// error. Values already in canonical form re-emit unchanged.
pub fn normalize_date(raw: &str) -> CellValue {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return CellValue::Text(
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return CellValue::Text(
                Utc.from_utc_datetime(&naive)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
            return CellValue::Text(
                Utc.from_utc_datetime(&naive)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
    }
    CellValue::Null
}

/// Strips currency symbols, thousands separators, and whitespace, then
/// parses a decimal number.
pub fn normalize_money(raw: &str) -> CellValue {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',') && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(n) => CellValue::Number(n),
        Err(_) => CellValue::Null,
    }
}

/// US-style phone formatting. 10 digits -> `(AAA) BBB-CCCC`; 11 digits with
/// a leading 1 -> the same after dropping the 1; anything else passes
/// through trimmed. A number is never discarded just because it does not
/// fit a known shape.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    };
    if digits.len() == 10 {
        format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
    } else {
        raw.trim().to_string()
    }
}

/// Maps a free-text status onto the fixed taxonomy, or returns it unchanged
/// when no bucket recognizes it.
pub fn normalize_status(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    for (bucket, variants) in STATUS_BUCKETS {
        if variants.iter().any(|v| lowered.contains(v)) {
            return (*bucket).to_string();
        }
    }
    raw.to_string()
}

/// Canonical tag list form: comma-delimited, each piece trimmed, empty
/// pieces dropped. Still a single delimited string, matching the persisted
/// record shape.
pub fn normalize_tags(raw: &str) -> CellValue {
    let parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(parts.join(","))
    }
}
