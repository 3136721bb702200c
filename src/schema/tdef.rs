//! schema/tdef — decode a table definition (tdef) into `TableDefinition`.
//!
//! Input is the concatenated tdef content (first page whole, continuation
//! pages from offset 8; see catalog::read_tdef_bytes). Blocks, in order:
//!
//! ```text
//! [header 63 B]
//! [real-index block 12 B] × num_real_idx     magic 1923, entry count, reserved
//! [column record 25 B]    × num_cols         magic 1625 at +1
//! [name: u16 len + UTF-16LE] × num_cols
//! ... (bounded scan for magic 1923) ...
//! [real-index def 52 B]   × num_real_idx
//! [logical index 28 B]    × num_idx, then logical names
//! ```
//!
//! Zero columns and zero indexes are valid. Layout violations are
//! UnsupportedFormat (bad magic) or PageBounds (truncated block).

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::consts::{
    IDX_ORDER_ASCENDING, IDX_TYPE_PRIMARY_KEY, IDX_UNUSED_COLUMN, INDEX_SCAN_WINDOW,
    MAGIC_INDEX_NUMBER, MAGIC_TABLE_NUMBER, PAGE_TYPE_TDEF, TDEF_COLUMN_LEN, TDEF_HEADER_LEN,
    TDEF_IDX_MAX_COLUMNS, TDEF_LOGICAL_IDX_LEN, TDEF_OFF_MAX_COLS, TDEF_OFF_NUM_COLS,
    TDEF_OFF_NUM_IDX, TDEF_OFF_NUM_REAL_IDX, TDEF_OFF_ROW_COUNT, TDEF_OFF_TABLE_TYPE,
    TDEF_OFF_USAGE_MAP, TDEF_OFF_VAR_COLS, TDEF_REAL_IDX_BLOCK_LEN, TDEF_REAL_IDX_DEF_LEN,
};
use crate::error::{MnyError, Result};

use super::{ColumnDefinition, ColumnType, IndexColumn, IndexDefinition, TableDefinition};

/// Parse a decrypted table definition. `name` is filled in by the catalog.
pub fn parse_table_definition(tdef_page: u32, bytes: &[u8]) -> Result<TableDefinition> {
    let r = Reader {
        buf: bytes,
        page: tdef_page,
    };
    if bytes.len() < TDEF_HEADER_LEN {
        return Err(MnyError::page(tdef_page, "table definition shorter than its header"));
    }
    if bytes[0] != PAGE_TYPE_TDEF || bytes[1] != 0x01 {
        return Err(MnyError::format(format!(
            "page {} is not a table definition (magic {:02x} {:02x})",
            tdef_page, bytes[0], bytes[1]
        )));
    }

    let row_count = r.u32(TDEF_OFF_ROW_COUNT)?;
    let table_type = r.u8(TDEF_OFF_TABLE_TYPE)?;
    let max_cols = r.u16(TDEF_OFF_MAX_COLS)?;
    let var_cols = r.u16(TDEF_OFF_VAR_COLS)?;
    let num_cols = r.u16(TDEF_OFF_NUM_COLS)? as usize;
    let num_idx = r.u32(TDEF_OFF_NUM_IDX)? as usize;
    let num_real_idx = r.u32(TDEF_OFF_NUM_REAL_IDX)? as usize;
    let usage_map = r.u32(TDEF_OFF_USAGE_MAP)?;

    // Counts come from disk; cap them by what the buffer could possibly hold.
    if num_real_idx * TDEF_REAL_IDX_BLOCK_LEN + num_cols * TDEF_COLUMN_LEN > bytes.len() {
        return Err(MnyError::page(
            tdef_page,
            format!(
                "{} columns / {} indexes do not fit in {} bytes",
                num_cols,
                num_real_idx,
                bytes.len()
            ),
        ));
    }

    // ---- real-index blocks ----
    let mut off = TDEF_HEADER_LEN;
    let mut entry_counts = Vec::with_capacity(num_real_idx);
    for i in 0..num_real_idx {
        let magic = r.u32(off)?;
        if magic != MAGIC_INDEX_NUMBER {
            return Err(MnyError::format(format!(
                "tdef page {}: real-index block {} has magic {} (expected {})",
                tdef_page, i, magic, MAGIC_INDEX_NUMBER
            )));
        }
        entry_counts.push((r.u32(off + 4)?, off + 4));
        off += TDEF_REAL_IDX_BLOCK_LEN;
    }

    // ---- column records ----
    let mut columns = Vec::with_capacity(num_cols);
    for i in 0..num_cols {
        let c = off + i * TDEF_COLUMN_LEN;
        let magic = r.u32(c + 1)?;
        if magic != MAGIC_TABLE_NUMBER {
            return Err(MnyError::format(format!(
                "tdef page {}: column record {} has magic {} (expected {})",
                tdef_page, i, magic, MAGIC_TABLE_NUMBER
            )));
        }
        columns.push(ColumnDefinition {
            name: String::new(),
            col_type: ColumnType::from_tag(r.u8(c)?),
            col_num: r.u16(c + 5)?,
            var_slot: r.u16(c + 7)?,
            flags: r.u8(c + 15)?,
            fixed_offset: r.u16(c + 21)?,
            size: r.u16(c + 23)?,
        });
    }
    for (i, col) in columns.iter().enumerate() {
        if !col.is_fixed() || col.col_type == ColumnType::Bool {
            continue;
        }
        if let Some(width) = col.col_type.fixed_size() {
            if (col.size as usize) < width {
                return Err(MnyError::page(
                    tdef_page,
                    format!(
                        "column record {}: {} column declares {} bytes, needs {}",
                        i, col.col_type, col.size, width
                    ),
                ));
            }
        }
    }
    off += num_cols * TDEF_COLUMN_LEN;

    // ---- column names ----
    for col in columns.iter_mut() {
        let (name, next) = r.name(off)?;
        col.name = name;
        off = next;
    }
    let names_end = off;

    // ---- real-index definitions ----
    let mut indexes = Vec::with_capacity(num_real_idx);
    if num_real_idx > 0 {
        let start = find_index_defs(&r, names_end)?;
        if start != names_end {
            debug!(
                "tdef page {}: index definitions found {} bytes past the column names",
                tdef_page,
                start - names_end
            );
        }
        for (i, &(entry_count, entry_count_offset)) in entry_counts.iter().enumerate() {
            let d = start + i * TDEF_REAL_IDX_DEF_LEN;
            let magic = r.u32(d)?;
            if magic != MAGIC_INDEX_NUMBER {
                return Err(MnyError::format(format!(
                    "tdef page {}: index definition {} has magic {}",
                    tdef_page, i, magic
                )));
            }
            let mut key_cols = Vec::new();
            for k in 0..TDEF_IDX_MAX_COLUMNS {
                let e = d + 4 + k * 3;
                let col_num = r.u16(e)?;
                if col_num == IDX_UNUSED_COLUMN {
                    continue;
                }
                let column = columns
                    .iter()
                    .position(|c| c.col_num == col_num)
                    .ok_or_else(|| {
                        MnyError::format(format!(
                            "tdef page {}: index {} references unknown column {}",
                            tdef_page, i, col_num
                        ))
                    })?;
                key_cols.push(IndexColumn {
                    column,
                    ascending: r.u8(e + 2)? == IDX_ORDER_ASCENDING,
                });
            }
            indexes.push(IndexDefinition {
                number: i,
                name: format!("index#{}", i),
                columns: key_cols,
                usage_map: r.u32(d + 34)?,
                root_page: r.u32(d + 38)?,
                flags: r.u8(d + 42)?,
                primary_key: false,
                entry_count,
                entry_count_offset,
            });
        }
        off = start + num_real_idx * TDEF_REAL_IDX_DEF_LEN;
    }

    // ---- logical indexes (names / primary key), tolerated when short ----
    if num_idx > 0 {
        if let Err(e) = apply_logical_indexes(&r, off, num_idx, &mut indexes) {
            warn!("tdef page {}: logical index block unreadable: {}", tdef_page, e);
        }
    }

    Ok(TableDefinition {
        name: String::new(),
        tdef_page,
        table_type,
        row_count,
        max_cols,
        var_cols,
        usage_map,
        columns,
        indexes,
    })
}

/// Bounded scan for the index magic starting at the default offset.
fn find_index_defs(r: &Reader<'_>, from: usize) -> Result<usize> {
    let last = (from + INDEX_SCAN_WINDOW).min(r.buf.len().saturating_sub(4));
    let mut pos = from;
    while pos <= last {
        if LittleEndian::read_u32(&r.buf[pos..pos + 4]) == MAGIC_INDEX_NUMBER {
            return Ok(pos);
        }
        pos += 1;
    }
    Err(MnyError::format(format!(
        "tdef page {}: no index definition marker within {} bytes of offset {}",
        r.page, INDEX_SCAN_WINDOW, from
    )))
}

fn apply_logical_indexes(
    r: &Reader<'_>,
    start: usize,
    num_idx: usize,
    indexes: &mut [IndexDefinition],
) -> Result<()> {
    let mut links = Vec::with_capacity(num_idx);
    for i in 0..num_idx {
        let l = start + i * TDEF_LOGICAL_IDX_LEN;
        let real = r.u32(l + 8)? as usize;
        let kind = r.u8(l + 23)?;
        links.push((real, kind));
    }
    let mut off = start + num_idx * TDEF_LOGICAL_IDX_LEN;
    let mut named = vec![false; indexes.len()];
    for (real, kind) in links {
        let (name, next) = r.name(off)?;
        off = next;
        if let Some(idx) = indexes.get_mut(real) {
            if !named[real] {
                idx.name = name;
                named[real] = true;
            }
            if kind == IDX_TYPE_PRIMARY_KEY {
                idx.primary_key = true;
            }
        }
    }
    Ok(())
}

// ---------- helpers ----------

struct Reader<'a> {
    buf: &'a [u8],
    page: u32,
}

impl<'a> Reader<'a> {
    fn slice(&self, off: usize, len: usize) -> Result<&'a [u8]> {
        self.buf.get(off..off + len).ok_or_else(|| {
            MnyError::page(
                self.page,
                format!("tdef read of {} bytes at {} past end ({})", len, off, self.buf.len()),
            )
        })
    }

    fn u8(&self, off: usize) -> Result<u8> {
        Ok(self.slice(off, 1)?[0])
    }

    fn u16(&self, off: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.slice(off, 2)?))
    }

    fn u32(&self, off: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.slice(off, 4)?))
    }

    /// u16 byte length + UTF-16LE; returns the name and the next offset.
    fn name(&self, off: usize) -> Result<(String, usize)> {
        let len = self.u16(off)? as usize;
        let raw = self.slice(off + 2, len)?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok((String::from_utf16_lossy(&units), off + 2 + len))
    }
}
