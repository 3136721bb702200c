//! db/scan — чтение строк таблицы.
//!
//! - Страницы данных таблицы: все страницы с тегом 0x01 и tdef page таблицы
//!   (usage map не используется).
//! - Удалённые слоты пропускаются; lookup‑слот разыменовывается ровно один раз.
//! - RowDecode локален для строки: warn + skipped += 1 (MNY_STRICT_ROWS → ошибка).
//! - PageBounds страницы или каталога — фатально для всей операции.

use log::warn;

use crate::error::{MnyError, Result};
use crate::page::{data_page_belongs_to, data_row_slot, data_header_read, RowSlot};
use crate::pager::Pager;
use crate::row::{decode_row, Row, RowLocator};
use crate::schema::TableDefinition;

use super::core::MnyFile;

/// Результат скана: строки + число пропущенных (повреждённых) строк.
#[derive(Debug, Default)]
pub struct TableScan {
    pub rows: Vec<Row>,
    pub skipped: usize,
}

impl MnyFile {
    /// Прочитать все строки таблицы.
    pub fn read_table(&mut self, name: &str) -> Result<TableScan> {
        let def = self.table_definition(name)?;
        scan_rows(&mut self.pager, &def)
    }
}

/// Номера страниц данных таблицы, по возрастанию.
pub(crate) fn data_pages(pager: &mut Pager, tdef_page: u32) -> Result<Vec<u32>> {
    let mut out = Vec::new();
    for page_no in 1..pager.page_count() {
        let page = pager.read_page(page_no)?;
        if data_page_belongs_to(&page, tdef_page) {
            out.push(page_no);
        }
    }
    Ok(out)
}

pub(crate) fn scan_rows(pager: &mut Pager, def: &TableDefinition) -> Result<TableScan> {
    let strict = pager.config().strict_rows;
    let mut scan = TableScan::default();
    for page_no in data_pages(pager, def.tdef_page)? {
        let page = pager.read_page(page_no)?;
        let h = data_header_read(&page, page_no)?;
        for i in 0..h.row_count as usize {
            match read_slot(pager, &page, page_no, i, def) {
                Ok(Some(row)) => scan.rows.push(row),
                Ok(None) => {}
                Err(e) if e.is_row_local() && !strict => {
                    warn!("table '{}': skipping row: {}", def.name, e);
                    scan.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(scan)
}

fn read_slot(
    pager: &mut Pager,
    page: &[u8],
    page_no: u32,
    i: usize,
    def: &TableDefinition,
) -> Result<Option<Row>> {
    // locator row is one byte; slots past 255 cannot be addressed
    let row = u8::try_from(i).map_err(|_| MnyError::RowDecode {
        page: page_no,
        row: i as u16,
        reason: format!("slot {} does not fit a 1-byte row locator", i),
    })?;
    let locator = RowLocator { page: page_no, row };
    match data_row_slot(page, page_no, i)? {
        RowSlot::Deleted => Ok(None),
        RowSlot::Inline { start, end } => {
            let mut row = decode_row(&page[start..end], def, page_no, i as u16)?;
            row.locator = Some(locator);
            Ok(Some(row))
        }
        RowSlot::Lookup(target) => {
            if target.page == 0 || target.page >= pager.page_count() {
                return Err(MnyError::RowDecode {
                    page: page_no,
                    row: i as u16,
                    reason: format!("lookup pointer {} outside the file", target),
                });
            }
            let other = pager.read_page(target.page)?;
            let slot = data_row_slot(&other, target.page, target.row as usize).map_err(|e| {
                MnyError::RowDecode {
                    page: page_no,
                    row: i as u16,
                    reason: format!("lookup target {}: {}", target, e),
                }
            })?;
            match slot {
                RowSlot::Inline { start, end } => {
                    let mut row = decode_row(&other[start..end], def, page_no, i as u16)?;
                    row.locator = Some(locator);
                    Ok(Some(row))
                }
                RowSlot::Deleted => Ok(None),
                RowSlot::Lookup(_) => Err(MnyError::RowDecode {
                    page: page_no,
                    row: i as u16,
                    reason: format!("lookup target {} is itself a lookup", target),
                }),
            }
        }
    }
}
