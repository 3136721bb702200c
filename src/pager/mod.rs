//! pager — слой страниц .mny файла.
//!
//! Подмодули:
//! - core.rs  — структура Pager, open() с проверкой пароля, общие поля.
//! - io.rs    — чтение страниц (stage → диск + расшифровка 1..=14).
//! - stage.rs — буфер мутаций в памяти и commit через scratch‑копию + rename.

pub mod core;
pub mod io;
pub mod stage;

pub use self::core::Pager;
pub use stage::PageStage;
