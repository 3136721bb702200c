//! mnykit — Microsoft Money (.mny) codec engine.
//!
//! Слои (снизу вверх):
//! - crypto  — ключ из пароля и соли, RC4 страниц 1..=14, проверка пароля
//! - header  — заголовок файла (page 0)
//! - pager   — чтение/расшифровка страниц, stage мутаций, commit через scratch‑копию
//! - page    — форматы страниц данных и индекса
//! - schema  — tdef → TableDefinition, системный каталог
//! - row     — значения колонок и кодек строк
//! - index   — ключи индекса и вставка в B‑дерево
//! - db      — MnyFile: open / read_table / insert_row / commit

// Базовые модули
pub mod config;
pub mod consts;
pub mod error;

pub mod crypto;
pub mod header;
pub mod pager;
pub mod page;

pub mod schema;
pub mod row;
pub mod index;

pub mod db;
pub mod money;

// Удобные реэкспорты
pub use config::MnyConfig;
pub use db::{check_file_password, InsertReport, MnyFile, TableScan};
pub use error::{Capability, MnyError, Result};
pub use money::PendingRow;
pub use row::{Currency, OleDate, Row, RowLocator, Value};
pub use schema::{ColumnDefinition, ColumnType, IndexDefinition, TableDefinition};

pub use crypto::{
    crypt_page, derive_key, page_key, verify_password, DigestKind, EncodingKey, PageCipher,
};
pub use index::encode_key;
pub use schema::parse_table_definition;
