//! pager/io — чтение страниц:
//! - read_page_raw: байты страницы как на диске (шифротекст для 1..=14);
//! - read_page: stage → иначе диск + расшифровка;
//! - выход за пределы файла — PageBounds.

use log::trace;
use std::io::{Read, Seek, SeekFrom};

use crate::consts::PAGE_SIZE;
use crate::error::{MnyError, Result};

use super::core::Pager;

impl Pager {
    #[inline]
    fn check_page_no(&self, page_no: u32) -> Result<()> {
        if page_no >= self.page_count {
            return Err(MnyError::page(
                page_no,
                format!("beyond end of file ({} pages)", self.page_count),
            ));
        }
        Ok(())
    }

    /// Прочитать страницу как она лежит на диске (без расшифровки, без stage).
    pub fn read_page_raw(&mut self, page_no: u32, buf: &mut [u8]) -> Result<()> {
        self.check_page_no(page_no)?;
        if buf.len() != PAGE_SIZE {
            return Err(MnyError::page(
                page_no,
                format!("buffer size {} != page size {}", buf.len(), PAGE_SIZE),
            ));
        }
        let off = page_no as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(off))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Открытый текст страницы: сначала stage (незакоммиченные правки), затем диск.
    pub fn read_page(&mut self, page_no: u32) -> Result<Vec<u8>> {
        if let Some(p) = self.stage.get(page_no) {
            trace!("page {} served from stage", page_no);
            return Ok(p.to_vec());
        }
        let mut buf = vec![0u8; PAGE_SIZE];
        self.read_page_raw(page_no, &mut buf)?;
        self.cipher.decrypt(&mut buf, page_no);
        Ok(buf)
    }
}
