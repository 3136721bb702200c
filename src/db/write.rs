//! db/write — вставка строки со всеми индексами и атомарный commit.
//!
//! insert_row():
//! 1) encode_row (переменные колонки должны быть NULL);
//! 2) последняя страница данных таблицы, где хватает места (строка + 2 байта слота),
//!    иначе MissingCapability(DataPageAllocation);
//! 3) ключ и вставка в каждый индекс таблицы; UnsupportedColumnType пропускает
//!    только этот индекс; прочие ошибки отменяют всю вставку;
//! 4) tdef: row count + 1, счётчик записей индекса + 1, если ключ новый на листе.
//!
//! Все страницы идут в stage. При ошибке stage возвращается к состоянию до
//! этой вставки (предыдущие успешные вставки остаются), оригинал не тронут.
//! На диск — только через commit().

use byteorder::{ByteOrder, LittleEndian};
use log::{info, warn};

use crate::consts::TDEF_OFF_ROW_COUNT;
use crate::error::{Capability, MnyError, Result};
use crate::index::{encode_key, insert_entry};
use crate::page::data_append_row;
use crate::pager::Pager;
use crate::row::{encode_row, Row, RowLocator};
use crate::schema::TableDefinition;

use super::core::MnyFile;
use super::scan::data_pages;

/// Сводка одной вставки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertReport {
    pub locator: RowLocator,
    /// Индексы, получившие запись.
    pub indexes_updated: Vec<String>,
    /// Индексы, пропущенные (ignore nulls или неподдерживаемый тип ключа).
    pub indexes_skipped: Vec<String>,
}

impl MnyFile {
    /// Вставить строку в stage. При ошибке откатываются только страницы этой вставки.
    pub fn insert_row(&mut self, table: &str, row: &Row) -> Result<InsertReport> {
        let def = self.table_definition(table)?;
        let snapshot = self.pager.stage_snapshot();
        match insert_staged(&mut self.pager, &def, row) {
            Ok(r) => Ok(r),
            Err(e) => {
                self.pager.restore_stage(snapshot);
                Err(e)
            }
        }
    }

    /// Есть ли незакоммиченные изменения.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.pager.has_staged()
    }

    /// Записать stage (scratch‑копия + rename). Возвращает число страниц.
    pub fn commit(&mut self) -> Result<usize> {
        self.pager.commit()
    }

    /// Отбросить незакоммиченные изменения.
    pub fn discard(&mut self) {
        self.pager.discard();
    }
}

fn insert_staged(pager: &mut Pager, def: &TableDefinition, row: &Row) -> Result<InsertReport> {
    let raw = encode_row(row, def)?;
    let locator = place_row(pager, def, &raw)?;

    let max_depth = pager.config().max_index_depth;
    let mut updated = Vec::new();
    let mut skipped = Vec::new();
    let mut new_keys = Vec::new();
    for index in &def.indexes {
        let key = match encode_key(row, index, def) {
            Ok(Some(k)) => k,
            Ok(None) => {
                skipped.push(index.name.clone());
                continue;
            }
            Err(MnyError::UnsupportedColumnType { column, type_tag }) => {
                warn!(
                    "table '{}': index '{}' skipped, key column '{}' has type 0x{:02x}",
                    def.name, index.name, column, type_tag
                );
                skipped.push(index.name.clone());
                continue;
            }
            Err(e) => return Err(e),
        };
        let outcome = insert_entry(
            pager,
            index,
            def.tdef_page,
            &key.bytes,
            key.all_null,
            locator,
            max_depth,
        )?;
        if outcome.new_key {
            new_keys.push(index.entry_count_offset);
        }
        updated.push(index.name.clone());
    }

    bump_counters(pager, def, &new_keys)?;
    info!(
        "table '{}': row staged at {} ({} index(es) updated)",
        def.name,
        locator,
        updated.len()
    );
    Ok(InsertReport {
        locator,
        indexes_updated: updated,
        indexes_skipped: skipped,
    })
}

fn place_row(pager: &mut Pager, def: &TableDefinition, raw: &[u8]) -> Result<RowLocator> {
    for page_no in data_pages(pager, def.tdef_page)?.into_iter().rev() {
        let mut page = pager.read_page(page_no)?;
        if let Some(row) = data_append_row(&mut page, page_no, raw)? {
            pager.stage_page(page_no, page)?;
            return Ok(RowLocator { page: page_no, row });
        }
    }
    Err(MnyError::missing(
        Capability::DataPageAllocation,
        format!(
            "no data page of table '{}' has room for {} bytes",
            def.name,
            raw.len() + 2
        ),
    ))
}

/// row count + 1 и счётчики индексов; все поля на первой странице tdef.
fn bump_counters(pager: &mut Pager, def: &TableDefinition, index_offsets: &[usize]) -> Result<()> {
    let mut page = pager.read_page(def.tdef_page)?;
    for &off in std::iter::once(&TDEF_OFF_ROW_COUNT).chain(index_offsets) {
        if off + 4 > page.len() {
            return Err(MnyError::page(
                def.tdef_page,
                format!("counter at {} is not on the first tdef page", off),
            ));
        }
        let v = LittleEndian::read_u32(&page[off..off + 4]);
        LittleEndian::write_u32(&mut page[off..off + 4], v.wrapping_add(1));
    }
    pager.stage_page(def.tdef_page, page)
}
