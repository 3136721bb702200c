//! index/key — index key bytes that sort correctly under plain byte comparison.
//!
//! Per key column, in index order:
//! - NULL: `0x00` ascending / `0xFF` descending.
//! - value: `0x7F` ascending / `0x80` descending, then the value:
//!   - integers big-endian with the sign bit flipped;
//!   - floats and OLE dates big-endian, sign bit flipped when non-negative,
//!     whole value complemented when `negative == ascending`;
//!   - currency as a scaled 32-bit integer;
//!   - booleans are a single byte with no start marker (`0x00` true / `0xFF` false ascending).
//! - descending columns complement every value byte.
//!
//! Text with a value, memo, OLE, binary, GUID and numeric columns cannot be
//! keyed; the whole index is then skipped by the caller.

use crate::consts::{
    KEY_BOOL_FALSE_ASC, KEY_BOOL_TRUE_ASC, KEY_NULL_ASC, KEY_NULL_DESC, KEY_START_ASC,
    KEY_START_DESC,
};
use crate::error::{MnyError, Result};
use crate::row::{Row, Value};
use crate::schema::{ColumnDefinition, ColumnType, IndexDefinition, TableDefinition};

/// Encoded key of one row under one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedKey {
    pub bytes: Vec<u8>,
    /// Every key column was NULL.
    pub all_null: bool,
}

/// Key for `row` under `index`. `Ok(None)` = index ignores nulls and every key column is NULL.
pub fn encode_key(
    row: &Row,
    index: &IndexDefinition,
    table: &TableDefinition,
) -> Result<Option<EncodedKey>> {
    let mut bytes = Vec::new();
    let mut all_null = true;
    for ic in &index.columns {
        let col = table.columns.get(ic.column).ok_or_else(|| {
            MnyError::format(format!(
                "index '{}' refers to column #{} of {}",
                index.name,
                ic.column,
                table.columns.len()
            ))
        })?;
        let mut value = row.get(&col.name).cloned().unwrap_or(Value::Null);
        // False booleans are stored as NULL, so NULL keys as false.
        if col.col_type == ColumnType::Bool && value.is_null() {
            value = Value::Bool(false);
        }
        check_keyable(col, &value)?;
        if !value.is_null() {
            all_null = false;
        }
        encode_column(&mut bytes, col, &value, ic.ascending)?;
    }
    if all_null && index.ignores_nulls() && !index.columns.is_empty() {
        return Ok(None);
    }
    Ok(Some(EncodedKey { bytes, all_null }))
}

fn check_keyable(col: &ColumnDefinition, value: &Value) -> Result<()> {
    let ok = match col.col_type {
        ColumnType::Bool
        | ColumnType::Byte
        | ColumnType::Int
        | ColumnType::Long
        | ColumnType::BigInt
        | ColumnType::Complex
        | ColumnType::Money
        | ColumnType::Float
        | ColumnType::Double
        | ColumnType::DateTime => true,
        ColumnType::Text => value.is_null(),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(MnyError::UnsupportedColumnType {
            column: col.name.clone(),
            type_tag: col.col_type.tag(),
        })
    }
}

fn encode_column(out: &mut Vec<u8>, col: &ColumnDefinition, value: &Value, asc: bool) -> Result<()> {
    if let (ColumnType::Bool, Value::Bool(b)) = (col.col_type, value) {
        let asc_byte = if *b { KEY_BOOL_TRUE_ASC } else { KEY_BOOL_FALSE_ASC };
        out.push(if asc { asc_byte } else { !asc_byte });
        return Ok(());
    }
    if value.is_null() {
        out.push(if asc { KEY_NULL_ASC } else { KEY_NULL_DESC });
        return Ok(());
    }
    out.push(if asc { KEY_START_ASC } else { KEY_START_DESC });

    let mut body: Vec<u8> = match (col.col_type, value) {
        (ColumnType::Byte, Value::Integer(v)) => {
            vec![u8::try_from(*v).map_err(|_| range(col, *v))?]
        }
        (ColumnType::Int, Value::Integer(v)) => {
            let x = i16::try_from(*v).map_err(|_| range(col, *v))?;
            flip_sign(x.to_be_bytes().to_vec())
        }
        (ColumnType::Long | ColumnType::Complex, Value::Integer(v)) => {
            let x = i32::try_from(*v).map_err(|_| range(col, *v))?;
            flip_sign(x.to_be_bytes().to_vec())
        }
        (ColumnType::BigInt, Value::Integer(v)) => flip_sign(v.to_be_bytes().to_vec()),
        (ColumnType::Money, Value::Currency(c)) => {
            let x = i32::try_from(c.raw()).map_err(|_| MnyError::ValueOutOfRange {
                column: col.name.clone(),
                reason: format!("currency {} exceeds the 32-bit key range", c),
            })?;
            flip_sign(x.to_be_bytes().to_vec())
        }
        (ColumnType::Float, Value::Float(v)) => {
            let f = *v as f32;
            push_float(out, f.to_be_bytes().to_vec(), f.is_sign_negative(), asc);
            return Ok(());
        }
        (ColumnType::Double, Value::Float(v)) => {
            push_float(out, v.to_be_bytes().to_vec(), v.is_sign_negative(), asc);
            return Ok(());
        }
        (ColumnType::DateTime, Value::Date(d)) => {
            let v = d.days();
            push_float(out, v.to_be_bytes().to_vec(), v.is_sign_negative(), asc);
            return Ok(());
        }
        (t, v) => {
            return Err(MnyError::ValueOutOfRange {
                column: col.name.clone(),
                reason: format!("{} value for a {} key column", v.kind(), t),
            })
        }
    };
    if !asc {
        complement(&mut body);
    }
    out.extend_from_slice(&body);
    Ok(())
}

fn push_float(out: &mut Vec<u8>, mut bits: Vec<u8>, negative: bool, asc: bool) {
    if !negative {
        bits[0] ^= 0x80;
    }
    if negative == asc {
        complement(&mut bits);
    }
    out.extend_from_slice(&bits);
}

#[inline]
fn flip_sign(mut be: Vec<u8>) -> Vec<u8> {
    be[0] ^= 0x80;
    be
}

#[inline]
fn complement(b: &mut [u8]) {
    for x in b.iter_mut() {
        *x = !*x;
    }
}

fn range(col: &ColumnDefinition, v: i64) -> MnyError {
    MnyError::ValueOutOfRange {
        column: col.name.clone(),
        reason: format!("{} does not fit a {} key column", v, col.col_type),
    }
}
