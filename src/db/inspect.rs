//! db/inspect — обход индексов для проверки достижимости строк.

use crate::error::{MnyError, Result};
use crate::index::list_entries;
use crate::page::IndexEntry;

use super::core::MnyFile;

impl MnyFile {
    /// Все записи листьев индекса в порядке ключей.
    pub fn index_entries(&mut self, table: &str, index: &str) -> Result<Vec<IndexEntry>> {
        let def = self.table_definition(table)?;
        let idx = def.index(index).ok_or_else(|| MnyError::IndexNotFound {
            table: def.name.clone(),
            index: index.to_string(),
        })?;
        let max_depth = self.pager.config().max_index_depth;
        list_entries(&mut self.pager, idx, def.tdef_page, max_depth)
    }
}
