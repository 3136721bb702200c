//! db — high-level API над одним .mny файлом.
//!
//! Разделение по подмодулям:
//! - core.rs    — MnyFile, open()/open_with_config(), каталог, определения таблиц
//! - scan.rs    — чтение строк таблицы (TableScan, пропуск повреждённых строк)
//! - write.rs   — insert_row в stage + обновление индексов и счётчиков tdef, commit()
//! - inspect.rs — обход индексов (index_entries)

pub mod core;
pub mod inspect;
pub mod scan;
pub mod write;

pub use self::core::{check_file_password, MnyFile, CATALOG_TABLE_NAME};
pub use scan::TableScan;
pub use write::InsertReport;

use crate::error::Result;
use crate::money::PendingRow;

impl MnyFile {
    /// Вставить строку из staging store (значения приводятся по схеме таблицы).
    pub fn insert_pending(&mut self, pending: &PendingRow) -> Result<InsertReport> {
        let def = self.table_definition(&pending.table)?;
        let row = pending.to_row(&def)?;
        self.insert_row(&def.name, &row)
    }
}
