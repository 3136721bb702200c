//! row/codec — row frame ⇄ `Row`.
//!
//! Frame (all LE):
//!
//! ```text
//! [column count u16]
//! [fixed area]                         column at 2 + fixed_offset
//! [variable data]
//! [var offsets u16 × (v+1), reversed]  only when the table has variable columns
//! [var count u16]                      ditto
//! [null mask ⌈count/8⌉]                bit set = value present
//! ```
//!
//! Booleans of size 0 live in the null mask only. The write path emits fixed
//! columns; variable columns must be NULL (MissingCapability otherwise) and a
//! logically false boolean is written as NULL.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Capability, MnyError, Result};
use crate::schema::{ColumnDefinition, ColumnType, TableDefinition};

use super::{Currency, OleDate, Row, Value};

/// Inline long-value flag in the first memo/OLE length word.
const LVAL_INLINE: u32 = 0x8000_0000;
const LVAL_HEADER_LEN: usize = 12;
const LVAL_LEN_MASK: u32 = 0x3FFF_FFFF;

/// Decode one row slice. Any inconsistency is `RowDecode` for (page, row).
pub fn decode_row(raw: &[u8], table: &TableDefinition, page: u32, row: u16) -> Result<Row> {
    decode_frame(raw, table).map_err(|reason| MnyError::RowDecode { page, row, reason })
}

fn decode_frame(raw: &[u8], table: &TableDefinition) -> std::result::Result<Row, String> {
    if raw.len() < 2 {
        return Err(format!("row of {} bytes has no column count", raw.len()));
    }
    let row_cols = LittleEndian::read_u16(&raw[0..2]) as usize;
    let mask_len = (row_cols + 7) / 8;
    if raw.len() < 2 + mask_len {
        return Err(format!(
            "row of {} bytes cannot hold a null mask for {} columns",
            raw.len(),
            row_cols
        ));
    }
    let mask_start = raw.len() - mask_len;
    let mask = &raw[mask_start..];

    // Variable-offset table sits right before the null mask.
    let mut var_offsets: Vec<usize> = Vec::new();
    let mut data_end = mask_start;
    if table.has_variable_columns() {
        if mask_start < 4 {
            return Err("row too short for its variable-column table".to_string());
        }
        let var_count = LittleEndian::read_u16(&raw[mask_start - 2..mask_start]) as usize;
        let table_len = 2 + 2 * (var_count + 1);
        if mask_start < 2 + table_len {
            return Err(format!(
                "variable-column table ({} entries) runs past the row start",
                var_count
            ));
        }
        let count_pos = mask_start - 2;
        for i in 0..=var_count {
            let p = count_pos - 2 * (i + 1);
            var_offsets.push(LittleEndian::read_u16(&raw[p..p + 2]) as usize);
        }
        data_end = count_pos - 2 * (var_count + 1);
    }

    let mut out = Row::new();
    for col in &table.columns {
        let n = col.col_num as usize;
        let present = n < row_cols && mask[n / 8] & (1 << (n % 8)) != 0;

        if col.col_type == ColumnType::Bool {
            out.values.push((col.name.clone(), decode_bool(raw, col, present, n < row_cols, data_end)?));
            continue;
        }
        if !present {
            out.values.push((col.name.clone(), Value::Null));
            continue;
        }

        let value = if col.is_fixed() {
            let width = col
                .col_type
                .fixed_size()
                .ok_or_else(|| unsupported(col))?;
            let start = 2 + col.fixed_offset as usize;
            if start + width > data_end {
                return Err(format!(
                    "column '{}' at {}..{} exceeds fixed data ending at {}",
                    col.name,
                    start,
                    start + width,
                    data_end
                ));
            }
            decode_fixed(&raw[start..start + width], col)?
        } else {
            let slot = col.var_slot as usize;
            if slot + 1 >= var_offsets.len() {
                // column added after this row was written
                Value::Null
            } else {
                let (s, e) = (var_offsets[slot], var_offsets[slot + 1]);
                if s > e || e > data_end {
                    return Err(format!(
                        "variable column '{}' spans {}..{} outside {}",
                        col.name, s, e, data_end
                    ));
                }
                decode_variable(&raw[s..e], col)?
            }
        };
        out.values.push((col.name.clone(), value));
    }
    Ok(out)
}

fn decode_bool(
    raw: &[u8],
    col: &ColumnDefinition,
    present: bool,
    in_row: bool,
    data_end: usize,
) -> std::result::Result<Value, String> {
    if !in_row {
        return Ok(Value::Null);
    }
    if col.size == 0 || !col.is_fixed() {
        return Ok(Value::Bool(present));
    }
    if !present {
        return Ok(Value::Null);
    }
    let at = 2 + col.fixed_offset as usize;
    if at >= data_end {
        return Err(format!("boolean column '{}' at {} past fixed data", col.name, at));
    }
    Ok(Value::Bool(raw[at] != 0))
}

fn decode_fixed(b: &[u8], col: &ColumnDefinition) -> std::result::Result<Value, String> {
    let v = match col.col_type {
        ColumnType::Byte => Value::Integer(b[0] as i64),
        ColumnType::Int => Value::Integer(LittleEndian::read_i16(b) as i64),
        ColumnType::Long | ColumnType::Complex => Value::Integer(LittleEndian::read_i32(b) as i64),
        ColumnType::BigInt => Value::Integer(LittleEndian::read_i64(b)),
        ColumnType::Money => Value::Currency(Currency(LittleEndian::read_i64(b))),
        ColumnType::Float => Value::Float(LittleEndian::read_f32(b) as f64),
        ColumnType::Double => Value::Float(LittleEndian::read_f64(b)),
        ColumnType::DateTime => Value::Date(OleDate(LittleEndian::read_f64(b))),
        ColumnType::Guid | ColumnType::Numeric => Value::Binary(b.to_vec()),
        _ => return Err(unsupported(col)),
    };
    Ok(v)
}

fn decode_variable(b: &[u8], col: &ColumnDefinition) -> std::result::Result<Value, String> {
    match col.col_type {
        ColumnType::Text => Ok(Value::Text(decode_text(b))),
        ColumnType::Binary => Ok(Value::Binary(b.to_vec())),
        ColumnType::Memo => Ok(match inline_long_value(b) {
            Some(data) => Value::Text(decode_text(data)),
            None => Value::Binary(b.to_vec()),
        }),
        ColumnType::Ole => Ok(match inline_long_value(b) {
            Some(data) => Value::Binary(data.to_vec()),
            None => Value::Binary(b.to_vec()),
        }),
        // A fixed type stored in the variable section (old rows).
        t if t.fixed_size().is_some() && b.len() >= t.fixed_size().unwrap_or(0) => {
            decode_fixed(b, col)
        }
        _ => Err(unsupported(col)),
    }
}

/// Inline memo/OLE payload; None when the value lives on other pages.
fn inline_long_value(b: &[u8]) -> Option<&[u8]> {
    if b.len() < LVAL_HEADER_LEN {
        return None;
    }
    let word = LittleEndian::read_u32(&b[0..4]);
    if word & LVAL_INLINE == 0 {
        return None;
    }
    let len = (word & LVAL_LEN_MASK) as usize;
    b.get(LVAL_HEADER_LEN..LVAL_HEADER_LEN + len)
}

fn unsupported(col: &ColumnDefinition) -> String {
    format!(
        "column '{}' has unsupported type 0x{:02x}",
        col.name,
        col.col_type.tag()
    )
}

/// UTF-16LE text, or the compressed form (`FF FE` prefix; `00` toggles
/// between one-byte characters and UTF-16LE units).
pub fn decode_text(b: &[u8]) -> String {
    if b.len() >= 2 && b[0] == 0xFF && b[1] == 0xFE {
        let mut units = Vec::with_capacity(b.len());
        let mut compressed = true;
        let mut i = 2;
        while i < b.len() {
            if b[i] == 0x00 {
                compressed = !compressed;
                i += 1;
                continue;
            }
            if compressed {
                units.push(b[i] as u16);
                i += 1;
            } else {
                if i + 1 >= b.len() {
                    break;
                }
                units.push(u16::from_le_bytes([b[i], b[i + 1]]));
                i += 2;
            }
        }
        return String::from_utf16_lossy(&units);
    }
    let units: Vec<u16> = b
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Pack a row for `table`. Missing columns are NULL.
pub fn encode_row(row: &Row, table: &TableDefinition) -> Result<Vec<u8>> {
    for (name, _) in &row.values {
        if table.column(name).is_none() {
            return Err(MnyError::ColumnNotFound {
                table: table.name.clone(),
                column: name.clone(),
            });
        }
    }

    let row_cols = table.row_column_count();
    let fixed_len = table.fixed_area_len();
    let mut buf = vec![0u8; 2 + fixed_len];
    LittleEndian::write_u16(&mut buf[0..2], row_cols as u16);
    let mut mask = vec![0u8; (row_cols + 7) / 8];

    for col in &table.columns {
        let value = row.get(&col.name).unwrap_or(&Value::Null);
        if value.is_null() {
            continue;
        }
        if col.is_variable() {
            return Err(MnyError::missing(
                Capability::VariableLengthWrite,
                format!("column '{}' of table '{}'", col.name, table.name),
            ));
        }
        let at = 2 + col.fixed_offset as usize;
        let width = match col.col_type {
            ColumnType::Bool => usize::from(col.size > 0),
            t => t.fixed_size().unwrap_or(0),
        };
        if at + width > buf.len() {
            return Err(MnyError::page(
                table.tdef_page,
                format!(
                    "column '{}' needs bytes {}..{} of a {}-byte fixed area",
                    col.name,
                    at,
                    at + width,
                    buf.len()
                ),
            ));
        }
        let bit = col.col_num as usize;
        match (col.col_type, value) {
            (ColumnType::Bool, Value::Bool(b)) => {
                if !*b {
                    continue;
                }
                if col.size > 0 {
                    buf[at] = 0xFF;
                }
            }
            (ColumnType::Byte, Value::Integer(v)) => {
                buf[at] = u8::try_from(*v).map_err(|_| out_of_range(col, *v))?;
            }
            (ColumnType::Int, Value::Integer(v)) => {
                let x = i16::try_from(*v).map_err(|_| out_of_range(col, *v))?;
                LittleEndian::write_i16(&mut buf[at..at + 2], x);
            }
            (ColumnType::Long, Value::Integer(v)) => {
                let x = i32::try_from(*v).map_err(|_| out_of_range(col, *v))?;
                LittleEndian::write_i32(&mut buf[at..at + 4], x);
            }
            (ColumnType::BigInt, Value::Integer(v)) => {
                LittleEndian::write_i64(&mut buf[at..at + 8], *v);
            }
            (ColumnType::Money, Value::Currency(c)) => {
                LittleEndian::write_i64(&mut buf[at..at + 8], c.raw());
            }
            (ColumnType::Float, Value::Float(v)) => {
                LittleEndian::write_f32(&mut buf[at..at + 4], *v as f32);
            }
            (ColumnType::Double, Value::Float(v)) => {
                LittleEndian::write_f64(&mut buf[at..at + 8], *v);
            }
            (ColumnType::DateTime, Value::Date(d)) => {
                LittleEndian::write_f64(&mut buf[at..at + 8], d.days());
            }
            (ColumnType::Guid | ColumnType::Numeric | ColumnType::Complex, _)
            | (ColumnType::Unknown(_), _) => {
                return Err(MnyError::UnsupportedColumnType {
                    column: col.name.clone(),
                    type_tag: col.col_type.tag(),
                });
            }
            (t, v) => {
                return Err(MnyError::ValueOutOfRange {
                    column: col.name.clone(),
                    reason: format!("{} value for a {} column", v.kind(), t),
                });
            }
        }
        mask[bit / 8] |= 1 << (bit % 8);
    }

    if table.has_variable_columns() {
        let var_count = table.columns.iter().filter(|c| c.is_variable()).count();
        let end = buf.len() as u16;
        for _ in 0..=var_count {
            buf.extend_from_slice(&end.to_le_bytes());
        }
        buf.extend_from_slice(&(var_count as u16).to_le_bytes());
    }
    buf.extend_from_slice(&mask);
    Ok(buf)
}

fn out_of_range(col: &ColumnDefinition, v: i64) -> MnyError {
    MnyError::ValueOutOfRange {
        column: col.name.clone(),
        reason: format!("{} does not fit a {} column", v, col.col_type),
    }
}
