//! Content-addressed row keys.
//!
//! A row's key is the `_`-join of its normalized field values in table
//! column order, so the same ranking captured twice on the same day maps to
//! the same key and the store replaces instead of duplicating.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

pub const MISSING_SENTINEL: &str = "Default Value";
pub const KEY_SEPARATOR: &str = "_";

/// A raw cell value before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
    Int(i64),
    Float(f64),
    Missing,
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map(Value::Text).unwrap_or(Value::Missing)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub column: &'static str,
    pub value: Value,
}

impl Field {
    pub fn new(column: &'static str, value: Value) -> Self {
        Self { column, value }
    }
}

/// Normalizes one cell: dates become `YYYY-MM-DD`, integer columns are
/// coerced (bad or missing input becomes 0), other missing values become
/// the sentinel.
pub fn normalize(field: &Field, int_columns: &[&str]) -> JsonValue {
    if int_columns.contains(&field.column) {
        return JsonValue::from(coerce_int(&field.value));
    }

    match &field.value {
        Value::Date(date) => JsonValue::from(iso_date(date)),
        Value::DateTime(datetime) => JsonValue::from(iso_date(&datetime.date())),
        Value::Text(text) if field.column == "date" => {
            JsonValue::from(parse_date(text).map(|d| iso_date(&d)).unwrap_or_else(|| text.clone()))
        }
        Value::Text(text) => JsonValue::from(text.clone()),
        Value::Int(n) => JsonValue::from(*n),
        Value::Float(f) => JsonValue::from(*f),
        Value::Missing => JsonValue::from(MISSING_SENTINEL),
    }
}

pub fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        Value::Text(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| {
                    text.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

pub fn unique_key(fields: &[Field], int_columns: &[&str]) -> String {
    fields
        .iter()
        .map(|field| match normalize(field, int_columns) {
            JsonValue::String(s) => s,
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

fn iso_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|d| d.date())
        })
}
