//! page/data — страницы данных (tag 0x01).
//!
//! Формат (LE):
//! ```text
//! 0x00 u8  tag = 0x01
//! 0x01 u8  0x01
//! 0x02 u16 free space
//! 0x04 u32 tdef page владельца
//! 0x08 u32 reserved
//! 0x0C u16 row count
//! 0x0E u16 × row count — смещения строк
//! ```
//! Смещение: младшие 13 бит — начало строки, 0x4000 — удалена, 0x8000 — lookup
//! (строка содержит указатель [row u8][page u24 LE] на overflow‑строку).
//! Строка i заканчивается там, где начинается строка i‑1 (строка 0 — в конце страницы).
//! Строки пакуются вниз от конца страницы.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{
    DATA_OFF_FREE_SPACE, DATA_OFF_ROW_COUNT, DATA_OFF_ROW_TABLE, DATA_OFF_TDEF_PAGE, PAGE_SIZE,
    PAGE_TYPE_DATA, ROW_FLAG_DELETED, ROW_FLAG_LOOKUP, ROW_OFFSET_MASK,
};
use crate::error::{MnyError, Result};
use crate::row::RowLocator;

/// Максимум строк на странице: номер строки в локаторе — один байт.
pub const MAX_ROWS_PER_PAGE: usize = 255;

/// Что лежит в слоте строки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSlot {
    Deleted,
    /// Указатель на строку, вынесенную на другую страницу.
    Lookup(RowLocator),
    /// Байтовый диапазон строки внутри страницы.
    Inline { start: usize, end: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPageHeader {
    pub free_space: u16,
    pub tdef_page: u32,
    pub row_count: u16,
}

pub fn data_header_read(page: &[u8], page_no: u32) -> Result<DataPageHeader> {
    if page.len() != PAGE_SIZE || page[0] != PAGE_TYPE_DATA {
        return Err(MnyError::page(page_no, "not a data page"));
    }
    let h = DataPageHeader {
        free_space: LittleEndian::read_u16(&page[DATA_OFF_FREE_SPACE..DATA_OFF_FREE_SPACE + 2]),
        tdef_page: LittleEndian::read_u32(&page[DATA_OFF_TDEF_PAGE..DATA_OFF_TDEF_PAGE + 4]),
        row_count: LittleEndian::read_u16(&page[DATA_OFF_ROW_COUNT..DATA_OFF_ROW_COUNT + 2]),
    };
    if DATA_OFF_ROW_TABLE + 2 * h.row_count as usize > PAGE_SIZE {
        return Err(MnyError::page(
            page_no,
            format!("row count {} overflows the page", h.row_count),
        ));
    }
    Ok(h)
}

/// Является ли страница страницей данных указанной таблицы.
#[inline]
pub fn data_page_belongs_to(page: &[u8], tdef_page: u32) -> bool {
    page.len() == PAGE_SIZE
        && page[0] == PAGE_TYPE_DATA
        && LittleEndian::read_u32(&page[DATA_OFF_TDEF_PAGE..DATA_OFF_TDEF_PAGE + 4]) == tdef_page
}

#[inline]
fn raw_offset(page: &[u8], i: usize) -> u16 {
    let p = DATA_OFF_ROW_TABLE + 2 * i;
    LittleEndian::read_u16(&page[p..p + 2])
}

/// Разобрать слот i. Диапазон проверяется: ошибка здесь локальна для строки.
pub fn data_row_slot(page: &[u8], page_no: u32, i: usize) -> Result<RowSlot> {
    let h = data_header_read(page, page_no)?;
    let n = h.row_count as usize;
    if i >= n {
        return Err(MnyError::page(page_no, format!("row {} of {}", i, n)));
    }
    let raw = raw_offset(page, i);
    if raw & ROW_FLAG_DELETED != 0 {
        return Ok(RowSlot::Deleted);
    }
    let start = (raw & ROW_OFFSET_MASK) as usize;
    // Конец — начало ближайшей предыдущей строки (флаги игнорируются).
    let end = if i == 0 {
        PAGE_SIZE
    } else {
        (raw_offset(page, i - 1) & ROW_OFFSET_MASK) as usize
    };
    let table_end = DATA_OFF_ROW_TABLE + 2 * n;
    if start < table_end || start > end || end > PAGE_SIZE {
        return Err(MnyError::RowDecode {
            page: page_no,
            row: i as u16,
            reason: format!("row bounds {}..{} invalid (row table ends at {})", start, end, table_end),
        });
    }
    if raw & ROW_FLAG_LOOKUP != 0 {
        if end - start < 4 {
            return Err(MnyError::RowDecode {
                page: page_no,
                row: i as u16,
                reason: "lookup row shorter than its pointer".to_string(),
            });
        }
        let b = &page[start..start + 4];
        return Ok(RowSlot::Lookup(RowLocator {
            row: b[0],
            page: LittleEndian::read_u24(&b[1..4]),
        }));
    }
    Ok(RowSlot::Inline { start, end })
}

/// Свободное место между таблицей смещений и самой нижней строкой.
pub fn data_free_space(page: &[u8], page_no: u32) -> Result<usize> {
    let h = data_header_read(page, page_no)?;
    let n = h.row_count as usize;
    let lowest = lowest_row_start(page, n);
    let table_end = DATA_OFF_ROW_TABLE + 2 * n;
    Ok(lowest.saturating_sub(table_end))
}

fn lowest_row_start(page: &[u8], n: usize) -> usize {
    (0..n)
        .map(|i| (raw_offset(page, i) & ROW_OFFSET_MASK) as usize)
        .filter(|&s| s > 0)
        .min()
        .unwrap_or(PAGE_SIZE)
}

/// Дописать строку. None — места нет (строка + 2 байта слота) или слоты кончились.
pub fn data_append_row(page: &mut [u8], page_no: u32, row: &[u8]) -> Result<Option<u8>> {
    let h = data_header_read(page, page_no)?;
    let n = h.row_count as usize;
    if n >= MAX_ROWS_PER_PAGE {
        return Ok(None);
    }
    let free = data_free_space(page, page_no)?;
    if row.len() + 2 > free {
        return Ok(None);
    }
    let start = lowest_row_start(page, n) - row.len();
    page[start..start + row.len()].copy_from_slice(row);

    let slot = DATA_OFF_ROW_TABLE + 2 * n;
    LittleEndian::write_u16(&mut page[slot..slot + 2], start as u16);
    LittleEndian::write_u16(
        &mut page[DATA_OFF_ROW_COUNT..DATA_OFF_ROW_COUNT + 2],
        (n + 1) as u16,
    );
    let new_free = free - row.len() - 2;
    LittleEndian::write_u16(
        &mut page[DATA_OFF_FREE_SPACE..DATA_OFF_FREE_SPACE + 2],
        new_free as u16,
    );
    Ok(Some(n as u8))
}

/// Пустая страница данных (для тестов и инструментов сборки файлов).
pub fn data_page_init(page: &mut [u8], tdef_page: u32) {
    page.fill(0);
    page[0] = PAGE_TYPE_DATA;
    page[1] = 0x01;
    LittleEndian::write_u32(&mut page[DATA_OFF_TDEF_PAGE..DATA_OFF_TDEF_PAGE + 4], tdef_page);
    LittleEndian::write_u16(
        &mut page[DATA_OFF_FREE_SPACE..DATA_OFF_FREE_SPACE + 2],
        (PAGE_SIZE - DATA_OFF_ROW_TABLE) as u16,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_packs_rows_downward() {
        let mut p = vec![0u8; PAGE_SIZE];
        data_page_init(&mut p, 17);
        assert_eq!(data_append_row(&mut p, 20, &[1, 2, 3]).unwrap(), Some(0));
        assert_eq!(data_append_row(&mut p, 20, &[4, 5]).unwrap(), Some(1));

        assert_eq!(
            data_row_slot(&p, 20, 0).unwrap(),
            RowSlot::Inline { start: PAGE_SIZE - 3, end: PAGE_SIZE }
        );
        assert_eq!(
            data_row_slot(&p, 20, 1).unwrap(),
            RowSlot::Inline { start: PAGE_SIZE - 5, end: PAGE_SIZE - 3 }
        );
        let h = data_header_read(&p, 20).unwrap();
        assert_eq!(h.row_count, 2);
        assert_eq!(h.tdef_page, 17);
        assert_eq!(h.free_space as usize, PAGE_SIZE - DATA_OFF_ROW_TABLE - 4 - 5);
    }

    #[test]
    fn full_page_refuses_the_row() {
        let mut p = vec![0u8; PAGE_SIZE];
        data_page_init(&mut p, 17);
        let big = vec![7u8; PAGE_SIZE - DATA_OFF_ROW_TABLE - 2];
        assert_eq!(data_append_row(&mut p, 20, &big).unwrap(), Some(0));
        assert_eq!(data_append_row(&mut p, 20, &[1]).unwrap(), None);
    }

    #[test]
    fn deleted_and_lookup_flags() {
        let mut p = vec![0u8; PAGE_SIZE];
        data_page_init(&mut p, 17);
        data_append_row(&mut p, 20, &[3, 0x10, 0, 0]).unwrap();
        data_append_row(&mut p, 20, &[9, 9]).unwrap();
        let s0 = LittleEndian::read_u16(&p[DATA_OFF_ROW_TABLE..]);
        LittleEndian::write_u16(&mut p[DATA_OFF_ROW_TABLE..], s0 | ROW_FLAG_LOOKUP);
        let s1 = LittleEndian::read_u16(&p[DATA_OFF_ROW_TABLE + 2..]);
        LittleEndian::write_u16(&mut p[DATA_OFF_ROW_TABLE + 2..], s1 | ROW_FLAG_DELETED);

        assert_eq!(
            data_row_slot(&p, 20, 0).unwrap(),
            RowSlot::Lookup(RowLocator { page: 0x10, row: 3 })
        );
        assert_eq!(data_row_slot(&p, 20, 1).unwrap(), RowSlot::Deleted);
    }
}
