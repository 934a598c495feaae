//! # Records
//!
//! One result row as an ordered JSON object keyed by column name. Backends
//! produce records; repositories decode them into typed row structs with
//! serde.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{DbError, DbResult};

/// A result row keyed by column name, in column order.
pub type Record = Map<String, Value>;

/// Decodes one record into `T`.
pub fn decode<T: DeserializeOwned>(record: Record) -> DbResult<T> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| DbError::conversion(format!("failed to decode row: {e}")))
}

/// Decodes every record into `T`.
pub fn decode_all<T: DeserializeOwned>(records: Vec<Record>) -> DbResult<Vec<T>> {
    records.into_iter().map(decode).collect()
}

/// Decodes the first record, if any.
pub fn decode_first<T: DeserializeOwned>(records: Vec<Record>) -> DbResult<Option<T>> {
    records.into_iter().next().map(decode).transpose()
}

/// Reads an integer column, tolerating DECIMAL columns that arrive as floats.
pub fn column_i64(record: &Record, column: &str) -> Option<i64> {
    let value = record.get(column)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
}

/// Parses a date column. `DATE` columns arrive as `2025-06-01`, `DATETIME`
/// and `DATETIMEOFFSET` columns carry a time part that is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// serde `deserialize_with` adapter for [`parse_date`].
pub fn date_column<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {raw}")))
}
