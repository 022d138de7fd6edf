use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A normalized cell value: text (including canonical RFC 3339 timestamps),
/// a number (monetary fields), or null.
///
/// Raw empty strings never survive normalization; they become `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// One entity-shaped record: canonical field name to normalized value.
///
/// A field absent from the column mapping is simply absent from the map;
/// a mapped field whose raw value was empty or unparsable is `Null`.
pub type NormalizedRow = BTreeMap<String, CellValue>;

/// Convenience lookup treating absent and `Null` the same way.
pub fn field_str<'a>(row: &'a NormalizedRow, name: &str) -> Option<&'a str> {
    row.get(name).and_then(CellValue::as_str)
}

pub fn field_f64(row: &NormalizedRow, name: &str) -> Option<f64> {
    row.get(name).and_then(CellValue::as_f64)
}
