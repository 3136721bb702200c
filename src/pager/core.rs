//! pager/core — ядро Pager: открытие .mny, проверка пароля, общие поля.
//!
//! Порядок open():
//! 1) длина файла кратна PAGE_SIZE (иначе UnsupportedFormat);
//! 2) page 0 → FileHeader (формат, соль, флаги шифрования);
//! 3) derive_key по паролю и соли;
//! 4) проверка тестовых байт заголовка (O(1), до любой расшифровки страниц);
//!    нулевые тестовые байты → структурный fallback: расшифрованная page 1
//!    должна начинаться с известного тега страницы.
//!
//! Файл открывается только на чтение. Все мутации идут в stage (см. stage.rs)
//! и попадают на диск только через commit() (scratch‑копия + rename).

use log::{debug, info, warn};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::config::MnyConfig;
use crate::consts::{PAGE_SIZE, PAGE_TYPE_DATA, PAGE_TYPE_USAGE_MAP};
use crate::crypto::{check_password, derive_key, PageCipher, PasswordCheck};
use crate::error::{MnyError, Result};
use crate::header::{validate_file_len, FileHeader};

use super::stage::PageStage;

/// Низкоуровневый менеджер страниц одного .mny файла.
pub struct Pager {
    pub(crate) path: PathBuf,
    pub(crate) file: File,
    pub(crate) header: FileHeader,
    pub(crate) cipher: PageCipher,
    pub(crate) page_count: u32,
    pub(crate) cfg: MnyConfig,
    pub(crate) stage: PageStage,
}

impl Pager {
    /// Открыть файл и проверить пароль. BadPassword возвращается до расшифровки
    /// каких‑либо страниц (кроме fallback‑проверки page 1 при пустых тестовых байтах).
    pub fn open(path: &Path, password: &str, cfg: MnyConfig) -> Result<Self> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        let page_count = validate_file_len(len)?;

        let mut page0 = vec![0u8; PAGE_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut page0)?;
        let header = FileHeader::parse(&page0)?;

        let key = derive_key(password, &header.salt, header.digest_kind());
        let cipher = PageCipher::new(key);

        match check_password(&page0, cipher.key())? {
            PasswordCheck::Verified => {
                debug!("open {}: header test bytes verified", path.display());
            }
            PasswordCheck::Rejected => return Err(MnyError::BadPassword),
            PasswordCheck::Inconclusive => {
                if !cfg.structural_fallback || page_count < 2 {
                    return Err(MnyError::BadPassword);
                }
                let mut page1 = vec![0u8; PAGE_SIZE];
                file.seek(SeekFrom::Start(PAGE_SIZE as u64))?;
                file.read_exact(&mut page1)?;
                cipher.decrypt(&mut page1, 1);
                if !(PAGE_TYPE_DATA..=PAGE_TYPE_USAGE_MAP).contains(&page1[0]) {
                    return Err(MnyError::BadPassword);
                }
                warn!(
                    "open {}: blank password test bytes, accepted by page 1 structure (tag 0x{:02x})",
                    path.display(),
                    page1[0]
                );
            }
        }

        info!(
            "opened {} ({:?} v{}, {:?}, {} pages)",
            path.display(),
            header.format,
            header.version,
            header.digest_kind(),
            page_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            cipher,
            page_count,
            cfg,
            stage: PageStage::default(),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    #[inline]
    pub fn cipher(&self) -> &PageCipher {
        &self.cipher
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn config(&self) -> &MnyConfig {
        &self.cfg
    }
}
