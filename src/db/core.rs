//! db/core — структура MnyFile, открытие файла и загрузка каталога.
//!
//! open():
//! - Pager::open проверяет формат и пароль (BadPassword — до любой мутации);
//! - tdef каталога (page 2) → TableDefinition;
//! - строки каталога → Catalog (имя таблицы → tdef page).
//!
//! Определения таблиц перечитываются при каждом обращении: во время записи
//! tdef может лежать в stage с обновлёнными счётчиками.

use log::debug;
use std::path::Path;

use crate::config::MnyConfig;
use crate::consts::CATALOG_TDEF_PAGE;
use crate::error::{MnyError, Result};
use crate::pager::Pager;
use crate::schema::{parse_table_definition, read_tdef_bytes, Catalog, TableDefinition};

/// Catalog table name as stored in its own catalog row.
pub const CATALOG_TABLE_NAME: &str = "MSysObjects";

/// Открытый .mny файл: pager + каталог таблиц.
pub struct MnyFile {
    pub(crate) pager: Pager,
    pub(crate) catalog: Catalog,
}

impl MnyFile {
    /// Открыть с конфигурацией из окружения (MNY_*).
    pub fn open(path: &Path, password: &str) -> Result<Self> {
        Self::open_with_config(path, password, MnyConfig::from_env())
    }

    pub fn open_with_config(path: &Path, password: &str, cfg: MnyConfig) -> Result<Self> {
        let mut pager = Pager::open(path, password, cfg)?;
        let catalog_def = load_definition(&mut pager, CATALOG_TABLE_NAME, CATALOG_TDEF_PAGE)?;
        let scan = super::scan::scan_rows(&mut pager, &catalog_def)?;
        let catalog = Catalog::from_rows(&scan.rows);
        debug!(
            "catalog: {} object(s), {} table(s), {} skipped row(s)",
            scan.rows.len(),
            catalog.entries().len(),
            scan.skipped
        );
        Ok(Self { pager, catalog })
    }

    #[inline]
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    pub fn config(&self) -> &MnyConfig {
        self.pager.config()
    }

    /// Имена пользовательских таблиц.
    pub fn list_tables(&self) -> Vec<String> {
        self.catalog.user_tables().map(|e| e.name.clone()).collect()
    }

    /// Определение таблицы по имени (без учёта регистра).
    pub fn table_definition(&mut self, name: &str) -> Result<TableDefinition> {
        let entry = self.catalog.lookup(name)?.clone();
        load_definition(&mut self.pager, &entry.name, entry.tdef_page)
    }
}

/// Только проверка пароля: false на BadPassword, прочие ошибки — как есть.
pub fn check_file_password(path: &Path, password: &str, cfg: MnyConfig) -> Result<bool> {
    match Pager::open(path, password, cfg) {
        Ok(_) => Ok(true),
        Err(MnyError::BadPassword) => Ok(false),
        Err(e) => Err(e),
    }
}

pub(crate) fn load_definition(pager: &mut Pager, name: &str, tdef_page: u32) -> Result<TableDefinition> {
    let bytes = read_tdef_bytes(pager, tdef_page)?;
    let mut def = parse_table_definition(tdef_page, &bytes)?;
    def.name = name.to_string();
    Ok(def)
}
