//! pager/stage — буферизация мутаций страниц в памяти и атомарный commit.
//!
//! Идея:
//! - Любая запись страницы попадает в PageStage (page_no → открытый текст).
//! - Чтения во время записи сначала смотрят в stage (см. io.rs).
//! - commit(): копия файла → scratch; запись staged страниц (1..=14 шифруются
//!   заново); fsync (MNY_DATA_FSYNC); rename поверх оригинала; fsync каталога.
//! - discard()/Drop без commit — оригинал не тронут.
//!
//! Ошибка на любом шаге оставляет оригинал как был; scratch удаляется best‑effort.
//! Неудачный scratch в MNY_SCRATCH_DIR (другая ФС, нет каталога) → повтор рядом с файлом.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::consts::PAGE_SIZE;
use crate::error::{MnyError, Result};

use super::core::Pager;

/// Незакоммиченные страницы (открытый текст).
#[derive(Debug, Default, Clone)]
pub struct PageStage {
    pages: BTreeMap<u32, Vec<u8>>,
}

impl PageStage {
    #[inline]
    pub fn get(&self, page_no: u32) -> Option<&[u8]> {
        self.pages.get(&page_no).map(|p| p.as_slice())
    }

    #[inline]
    pub fn put(&mut self, page_no: u32, page: Vec<u8>) {
        self.pages.insert(page_no, page);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    fn iter(&self) -> impl Iterator<Item = (&u32, &Vec<u8>)> {
        self.pages.iter()
    }
}

impl Pager {
    /// Положить изменённую страницу (открытый текст) в stage.
    pub fn stage_page(&mut self, page_no: u32, page: Vec<u8>) -> Result<()> {
        if page_no == 0 {
            return Err(MnyError::page(0, "the file header is never rewritten"));
        }
        if page_no >= self.page_count {
            return Err(MnyError::page(
                page_no,
                format!("beyond end of file ({} pages)", self.page_count),
            ));
        }
        if page.len() != PAGE_SIZE {
            return Err(MnyError::page(
                page_no,
                format!("staged buffer is {} bytes, expected {}", page.len(), PAGE_SIZE),
            ));
        }
        debug!("stage page {}", page_no);
        self.stage.put(page_no, page);
        Ok(())
    }

    #[inline]
    pub fn staged_pages(&self) -> Vec<u32> {
        self.stage.page_numbers()
    }

    #[inline]
    pub fn has_staged(&self) -> bool {
        !self.stage.is_empty()
    }

    /// Копия stage перед операцией из нескольких страниц.
    pub(crate) fn stage_snapshot(&self) -> PageStage {
        self.stage.clone()
    }

    /// Вернуть stage к снимку: правки после него отбрасываются.
    pub(crate) fn restore_stage(&mut self, snapshot: PageStage) {
        let dropped = self
            .stage
            .iter()
            .filter(|(no, page)| snapshot.get(**no) != Some(page.as_slice()))
            .count();
        if dropped > 0 {
            warn!("rolling back {} staged page(s)", dropped);
        }
        self.stage = snapshot;
    }

    /// Отбросить все незакоммиченные правки.
    pub fn discard(&mut self) {
        if !self.stage.is_empty() {
            warn!("discarding {} staged page(s)", self.stage.len());
        }
        self.stage.clear();
    }

    /// Записать stage через scratch‑копию и заменить оригинал. Возвращает число страниц.
    ///
    /// rename работает только в пределах одной ФС: если scratch в MNY_SCRATCH_DIR
    /// не удалось записать или переименовать (например, EXDEV), повтор идёт через
    /// scratch рядом с файлом.
    pub fn commit(&mut self) -> Result<usize> {
        if self.stage.is_empty() {
            return Ok(0);
        }
        let scratch = self.scratch_path();
        if let Err(e) = self.replace_via(&scratch) {
            if self.cfg.scratch_dir.is_none() {
                return Err(e);
            }
            warn!(
                "scratch {} failed ({}); retrying next to {}",
                scratch.display(),
                e,
                self.path.display()
            );
            self.replace_via(&self.sibling_scratch_path())?;
        }
        let _ = fsync_dir(&self.path);

        // Хэндл на старый inode больше не актуален.
        self.file = File::open(&self.path)?;
        let n = self.stage.len();
        self.stage.clear();
        info!("committed {} page(s) to {}", n, self.path.display());
        Ok(n)
    }

    /// scratch → rename поверх оригинала; при ошибке scratch удаляется.
    fn replace_via(&self, scratch: &Path) -> Result<()> {
        if let Err(e) = self.write_scratch(scratch) {
            let _ = fs::remove_file(scratch);
            return Err(e);
        }
        if let Err(e) = fs::rename(scratch, &self.path) {
            let _ = fs::remove_file(scratch);
            return Err(e.into());
        }
        Ok(())
    }

    fn write_scratch(&self, scratch: &Path) -> Result<()> {
        fs::copy(&self.path, scratch)?;
        let mut f = OpenOptions::new().write(true).open(scratch)?;
        for (&page_no, plain) in self.stage.iter() {
            let mut buf = plain.clone();
            self.cipher.encrypt(&mut buf, page_no);
            f.seek(SeekFrom::Start(page_no as u64 * PAGE_SIZE as u64))?;
            f.write_all(&buf)?;
        }
        f.flush()?;
        if self.cfg.data_fsync {
            f.sync_all()?;
        }
        Ok(())
    }

    fn scratch_file_name(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "money.mny".to_string());
        format!(".{}.scratch-{}", name, std::process::id())
    }

    fn scratch_path(&self) -> PathBuf {
        match self.cfg.scratch_dir.as_deref() {
            Some(dir) => PathBuf::from(dir).join(self.scratch_file_name()),
            None => self.sibling_scratch_path(),
        }
    }

    fn sibling_scratch_path(&self) -> PathBuf {
        let file = self.scratch_file_name();
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.join(file),
            _ => PathBuf::from(file),
        }
    }
}

// ---------- helpers ----------

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
