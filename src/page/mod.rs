//! page — on-disk page layouts of the .mny format.
//!
//! Разделение по подмодулям:
//! - data.rs  — страницы данных: заголовок, слоты строк, дописывание строки.
//! - index.rs — страницы индекса: маска записей, общий префикс, decode/encode.
//!
//! Table definition pages are decoded by `schema::tdef`.

pub mod data;
pub mod index;

// ---------------- re-exports ----------------

pub use data::{
    data_append_row, data_free_space, data_header_read, data_page_belongs_to, data_page_init,
    data_row_slot, DataPageHeader, RowSlot, MAX_ROWS_PER_PAGE,
};

pub use index::{locator_bytes, IndexEntry, IndexPage, IndexPageKind};
