//! money — the Money tables this crate writes to and the pending-row input.
//!
//! A `PendingRow` comes from the external staging store: table name plus
//! column → JSON value, identifiers already resolved upstream. `to_row`
//! converts the JSON values into typed `Value`s using the table's schema.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MnyError, Result};
use crate::row::{Currency, OleDate, Row, Value};
use crate::schema::{ColumnDefinition, ColumnType, TableDefinition};

/// Accounts.
pub const TABLE_ACCOUNTS: &str = "ACCT";
/// Transactions.
pub const TABLE_TRANSACTIONS: &str = "TRN";
/// Payees.
pub const TABLE_PAYEES: &str = "PAY";
/// Categories.
pub const TABLE_CATEGORIES: &str = "CAT";

pub const MONEY_TABLES: [&str; 4] = [
    TABLE_ACCOUNTS,
    TABLE_TRANSACTIONS,
    TABLE_PAYEES,
    TABLE_CATEGORIES,
];

#[inline]
pub fn is_money_table(name: &str) -> bool {
    MONEY_TABLES.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// One row waiting to be merged into the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRow {
    pub table: String,
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl PendingRow {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn set<V: Into<serde_json::Value>>(mut self, column: &str, v: V) -> Self {
        self.values.insert(column.to_string(), v.into());
        self
    }

    /// Typed row for `def`. Unknown columns are `ColumnNotFound`.
    pub fn to_row(&self, def: &TableDefinition) -> Result<Row> {
        let mut row = Row::new();
        for (name, json) in &self.values {
            let col = def.column(name).ok_or_else(|| MnyError::ColumnNotFound {
                table: def.name.clone(),
                column: name.clone(),
            })?;
            row.set(&col.name, json_to_value(json, col)?);
        }
        Ok(row)
    }
}

fn bad(col: &ColumnDefinition, json: &serde_json::Value) -> MnyError {
    MnyError::ValueOutOfRange {
        column: col.name.clone(),
        reason: format!("cannot store {} in a {} column", json, col.col_type),
    }
}

/// JSON → `Value` for one column.
pub fn json_to_value(json: &serde_json::Value, col: &ColumnDefinition) -> Result<Value> {
    use serde_json::Value as J;
    if json.is_null() {
        return Ok(Value::Null);
    }
    let v = match col.col_type {
        ColumnType::Bool => match json {
            J::Bool(b) => Value::Bool(*b),
            J::Number(n) => Value::Bool(n.as_i64().map_or(false, |x| x != 0)),
            _ => return Err(bad(col, json)),
        },
        ColumnType::Byte
        | ColumnType::Int
        | ColumnType::Long
        | ColumnType::BigInt
        | ColumnType::Complex => match json {
            J::Number(n) => Value::Integer(n.as_i64().ok_or_else(|| bad(col, json))?),
            J::String(s) => Value::Integer(s.trim().parse().map_err(|_| bad(col, json))?),
            _ => return Err(bad(col, json)),
        },
        ColumnType::Money => match json {
            J::String(s) => Value::Currency(s.parse::<Currency>().map_err(|reason| {
                MnyError::ValueOutOfRange {
                    column: col.name.clone(),
                    reason,
                }
            })?),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Currency(Currency::from_units(i).ok_or_else(|| bad(col, json))?)
                } else {
                    let f = n.as_f64().ok_or_else(|| bad(col, json))?;
                    Value::Currency(Currency((f * 10_000.0).round() as i64))
                }
            }
            _ => return Err(bad(col, json)),
        },
        ColumnType::Float | ColumnType::Double => match json {
            J::Number(n) => Value::Float(n.as_f64().ok_or_else(|| bad(col, json))?),
            _ => return Err(bad(col, json)),
        },
        ColumnType::DateTime => match json {
            J::Number(n) => Value::Date(OleDate(n.as_f64().ok_or_else(|| bad(col, json))?)),
            J::String(s) => Value::Date(parse_date(s).ok_or_else(|| bad(col, json))?),
            _ => return Err(bad(col, json)),
        },
        ColumnType::Text | ColumnType::Memo => match json {
            J::String(s) => Value::Text(s.clone()),
            _ => return Err(bad(col, json)),
        },
        _ => match json {
            J::String(s) => Value::Text(s.clone()),
            _ => return Err(bad(col, json)),
        },
    };
    Ok(v)
}

/// `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_date(s: &str) -> Option<OleDate> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(OleDate::from_datetime(dt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(OleDate::from_datetime)
}
