// src/header.rs — file header (page 0, always plaintext)
//
// Layout consumed here (LE):
// 0x000 u8   page tag = 0x00
// 0x004 [16] format id ("MSISAM Database\0" | "Standard Jet DB\0")
// 0x014 u32  engine version
// 0x072 [8]  raw file salt
// 0x298 u32  crypt flags (0x06 NEW_ENCRYPTION must be set, 0x20 USE_SHA1)
// 0x2E9 ..   password test bytes at 0x2E9 + salt[0]
//
// Policy:
// - Anything we cannot interpret is UnsupportedFormat (fatal, never retried).
// - The header is never rewritten by the engine.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{
    FLAG_NEW_ENCRYPTION, FLAG_USE_SHA1, HDR_FORMAT_ID_LEN, HDR_FORMAT_JET, HDR_FORMAT_MSISAM,
    HDR_OFF_CRYPT_FLAGS, HDR_OFF_FORMAT_ID, HDR_OFF_SALT, HDR_OFF_VERSION, PAGE_SIZE,
    PAGE_TYPE_HEADER, SALT_LEN,
};
use crate::crypto::{base_salt, DigestKind};
use crate::error::{MnyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatId {
    Msisam,
    Jet,
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub format: FormatId,
    pub version: u32,
    pub salt: [u8; SALT_LEN],
    pub crypt_flags: u32,
}

impl FileHeader {
    /// Parse and validate page 0.
    pub fn parse(page0: &[u8]) -> Result<Self> {
        if page0.len() < PAGE_SIZE {
            return Err(MnyError::format(format!(
                "header page is {} bytes, expected {}",
                page0.len(),
                PAGE_SIZE
            )));
        }
        if page0[0] != PAGE_TYPE_HEADER {
            return Err(MnyError::format(format!(
                "page 0 tag 0x{:02x} is not a database header",
                page0[0]
            )));
        }

        let id = &page0[HDR_OFF_FORMAT_ID..HDR_OFF_FORMAT_ID + HDR_FORMAT_ID_LEN];
        let format = if id == HDR_FORMAT_MSISAM {
            FormatId::Msisam
        } else if id == HDR_FORMAT_JET {
            FormatId::Jet
        } else {
            return Err(MnyError::format("unknown format id in header"));
        };

        let version = LittleEndian::read_u32(&page0[HDR_OFF_VERSION..HDR_OFF_VERSION + 4]);
        let crypt_flags =
            LittleEndian::read_u32(&page0[HDR_OFF_CRYPT_FLAGS..HDR_OFF_CRYPT_FLAGS + 4]);
        if crypt_flags & FLAG_NEW_ENCRYPTION == 0 {
            return Err(MnyError::format(format!(
                "crypt flags 0x{:08x} lack NEW_ENCRYPTION",
                crypt_flags
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&page0[HDR_OFF_SALT..HDR_OFF_SALT + SALT_LEN]);

        Ok(Self {
            format,
            version,
            salt,
            crypt_flags,
        })
    }

    #[inline]
    pub fn digest_kind(&self) -> DigestKind {
        if self.crypt_flags & FLAG_USE_SHA1 != 0 {
            DigestKind::Sha1
        } else {
            DigestKind::Md5
        }
    }

    #[inline]
    pub fn base_salt(&self) -> [u8; 4] {
        base_salt(&self.salt)
    }
}

/// File length must be a non-zero multiple of the page size.
pub fn validate_file_len(len: u64) -> Result<u32> {
    let ps = PAGE_SIZE as u64;
    if len == 0 || len % ps != 0 {
        return Err(MnyError::format(format!(
            "file length {} is not a multiple of page size {}",
            len, ps
        )));
    }
    let pages = len / ps;
    u32::try_from(pages).map_err(|_| MnyError::format("file has too many pages"))
}
