//! row — typed column values and the row codec.
//!
//! - `Value` is a closed variant set; every caller matches it exhaustively.
//! - `Currency` is an i64 scaled by 10,000 (four implied decimals).
//! - `OleDate` is an f64 day count since 1899-12-30, fraction = time of day.
//! - codec.rs turns a data-page row slice into a `Row` and back.

pub mod codec;

pub use codec::{decode_row, decode_text, encode_row};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::consts::CURRENCY_SCALE;

/// Fixed-point money amount: raw value / 10,000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Currency(pub i64);

impl Currency {
    #[inline]
    pub fn from_raw(raw: i64) -> Self {
        Currency(raw)
    }

    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Whole units (e.g. dollars) without a fraction.
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(CURRENCY_SCALE).map(Currency)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = CURRENCY_SCALE as u64;
        write!(f, "{}{}.{:04}", sign, abs / scale, abs % scale)
    }
}

impl FromStr for Currency {
    type Err = String;

    /// Accepts `-12`, `12.5`, `0.0001`; more than four decimals is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let (neg, body) = match t.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, t.strip_prefix('+').unwrap_or(t)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("invalid currency '{}'", s));
        }
        let digits_only = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if !digits_only(int_part) || !digits_only(frac_part) {
            return Err(format!("invalid currency '{}'", s));
        }
        if frac_part.len() > 4 {
            return Err(format!("currency '{}' has more than 4 decimals", s));
        }
        let units: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| format!("invalid currency '{}'", s))?
        };
        let mut frac: i64 = 0;
        if !frac_part.is_empty() {
            let digits: i64 = frac_part
                .parse()
                .map_err(|_| format!("invalid currency '{}'", s))?;
            frac = digits * 10i64.pow(4 - frac_part.len() as u32);
        }
        let raw = units
            .checked_mul(CURRENCY_SCALE)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(|| format!("currency '{}' overflows", s))?;
        Ok(Currency(if neg { -raw } else { raw }))
    }
}

/// OLE automation date.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct OleDate(pub f64);

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn ole_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl OleDate {
    #[inline]
    pub fn days(self) -> f64 {
        self.0
    }

    /// Negative OLE dates count whole days backwards but the fraction still
    /// moves forward in time (-1.25 = 1899-12-29 06:00).
    pub fn to_datetime(self) -> Option<NaiveDateTime> {
        if !self.0.is_finite() {
            return None;
        }
        let whole = self.0.trunc();
        let frac = (self.0 - whole).abs();
        let ms = (whole * MILLIS_PER_DAY + frac * MILLIS_PER_DAY).round();
        if ms.abs() > i64::MAX as f64 / 2.0 {
            return None;
        }
        ole_epoch().checked_add_signed(Duration::milliseconds(ms as i64))
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        let ms = (dt - ole_epoch()).num_milliseconds() as f64;
        let days = (ms / MILLIS_PER_DAY).floor();
        let frac = (ms - days * MILLIS_PER_DAY) / MILLIS_PER_DAY;
        if days < 0.0 {
            OleDate(days - frac)
        } else {
            OleDate(days + frac)
        }
    }
}

impl fmt::Display for OleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "ole({})", self.0),
        }
    }
}

/// One decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Currency(Currency),
    Date(OleDate),
    Text(String),
    Binary(Vec<u8>),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Currency(_) => "currency",
            Value::Date(_) => "date",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Currency(c) => write!(f, "{}", c),
            Value::Date(d) => write!(f, "{}", d),
            Value::Text(s) => f.write_str(s),
            Value::Binary(b) => {
                for x in b {
                    write!(f, "{:02x}", x)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => s.serialize_none(),
            Value::Bool(b) => s.serialize_bool(*b),
            Value::Integer(v) => s.serialize_i64(*v),
            Value::Float(v) => s.serialize_f64(*v),
            Value::Currency(c) => s.serialize_str(&c.to_string()),
            Value::Date(d) => s.serialize_str(&d.to_string()),
            Value::Text(t) => s.serialize_str(t),
            Value::Binary(_) => s.serialize_str(&self.to_string()),
        }
    }
}

/// Physical position of a row: data page + slot in its row-offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowLocator {
    pub page: u32,
    pub row: u8,
}

impl fmt::Display for RowLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page, self.row)
    }
}

/// Column name → value, in table column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub values: Vec<(String, Value)>,
    pub locator: Option<RowLocator>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Case-insensitive lookup (column names in .mny files are mixed case).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self
            .values
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut m = s.serialize_map(Some(self.values.len()))?;
        for (k, v) in &self.values {
            m.serialize_entry(k, v)?;
        }
        m.end()
    }
}
