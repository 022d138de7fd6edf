//! Row Validator: partitions normalized rows into valid and invalid sets.
//!
//! A row with any error is excluded from the valid set entirely; there is no
//! partial-field salvage. Checks are independent per row, so the pass runs
//! under rayon; both partitions keep the input order.

use std::sync::OnceLock;

use rayon::prelude::*;
use regex::Regex;

use common::model::cell::{CellValue, NormalizedRow};
use common::model::entity::{required_fields, EntityKind};
use common::model::validation::{ValidRow, ValidationIssue, ValidationOutcome};

/// Offset from 0-based data-row position to the row number a user sees in a
/// spreadsheet: +1 for 1-based counting, +1 for the header row.
pub const ROW_INDEX_OFFSET: usize = 2;

/// Basic local@domain.tld shape; anything fancier is the mail server's
/// problem.
fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

/// Validates every row of one file. `rows` is in file order; indexes in the
/// outcome are spreadsheet-aligned (position + 2).
pub fn validate_rows(entity: EntityKind, rows: Vec<NormalizedRow>) -> ValidationOutcome {
    let email_re = email_re();
    let required = required_fields(entity);

    let checked: Vec<Result<ValidRow, ValidationIssue>> = rows
        .into_par_iter()
        .enumerate()
        .map(|(position, row)| {
            let errors = check_row(&row, &required, &email_re);
            let row_index = position + ROW_INDEX_OFFSET;
            if errors.is_empty() {
                Ok(ValidRow { row_index, row })
            } else {
                Err(ValidationIssue {
                    row_index,
                    row,
                    errors,
                })
            }
        })
        .collect();

    let mut outcome = ValidationOutcome::default();
    for result in checked {
        match result {
            Ok(valid) => outcome.valid.push(valid),
            Err(issue) => outcome.invalid.push(issue),
        }
    }
    outcome
}

fn check_row(row: &NormalizedRow, required: &[&str], email_re: &Regex) -> Vec<String> {
    let mut errors = Vec::new();

    for field in required {
        let present = matches!(row.get(*field), Some(value) if !value.is_null());
        if !present {
            errors.push(format!("Missing required field: {field}"));
        }
    }

    if let Some(CellValue::Text(email)) = row.get("email") {
        if !email_re.is_match(email) {
            errors.push(format!("Invalid email address: {email}"));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::cell::CellValue;

    fn contact(first: Option<&str>, last: Option<&str>, email: Option<&str>) -> NormalizedRow {
        let mut row = NormalizedRow::new();
        if let Some(v) = first {
            row.insert("first_name".to_string(), CellValue::Text(v.to_string()));
        }
        if let Some(v) = last {
            row.insert("last_name".to_string(), CellValue::Text(v.to_string()));
        }
        if let Some(v) = email {
            row.insert("email".to_string(), CellValue::Text(v.to_string()));
        }
        row
    }

    #[test]
    fn valid_and_invalid_partition() {
        let rows = vec![
            contact(Some("Jane"), Some("Doe"), Some("jane@example.com")),
            contact(None, Some("Smith"), None),
            contact(Some("Bob"), Some("Lee"), None),
        ];
        let outcome = validate_rows(EntityKind::Contact, rows);
        assert_eq!(outcome.valid.len(), 2);
        assert_eq!(outcome.invalid.len(), 1);
        assert_eq!(
            outcome.invalid[0].errors,
            vec!["Missing required field: first_name"]
        );
    }

    #[test]
    fn row_index_is_spreadsheet_aligned() {
        // header row + 3 data rows; data row at 0-based position 1 is broken
        let rows = vec![
            contact(Some("A"), Some("One"), None),
            contact(None, Some("Two"), None),
            contact(Some("C"), Some("Three"), None),
        ];
        let outcome = validate_rows(EntityKind::Contact, rows);
        assert_eq!(outcome.invalid[0].row_index, 3);
        assert_eq!(
            outcome.valid.iter().map(|v| v.row_index).collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn bad_email_collects_alongside_missing_fields() {
        let rows = vec![contact(None, Some("Doe"), Some("not-an-email"))];
        let outcome = validate_rows(EntityKind::Contact, rows);
        let errors = &outcome.invalid[0].errors;
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("first_name")));
        assert!(errors.iter().any(|e| e.contains("not-an-email")));
    }

    #[test]
    fn null_email_is_not_an_error() {
        let mut row = contact(Some("Jane"), Some("Doe"), None);
        row.insert("email".to_string(), CellValue::Null);
        let outcome = validate_rows(EntityKind::Contact, vec![row]);
        assert_eq!(outcome.valid.len(), 1);
    }

    #[test]
    fn job_requires_title_and_invoice_requires_amount() {
        let mut job = NormalizedRow::new();
        job.insert("status".to_string(), CellValue::Text("active".into()));
        let outcome = validate_rows(EntityKind::Job, vec![job]);
        assert_eq!(outcome.invalid[0].errors, vec!["Missing required field: title"]);

        let mut invoice = NormalizedRow::new();
        invoice.insert("amount".to_string(), CellValue::Number(120.0));
        let outcome = validate_rows(EntityKind::Invoice, vec![invoice]);
        assert_eq!(outcome.valid.len(), 1);
    }
}
