//! crypto/password — O(1) password verification against the header test bytes.

use log::debug;

use crate::consts::{CRYPT_CHECK_LEN, HDR_CRYPT_CHECK_START, HDR_OFF_SALT, SALT_LEN};
use crate::error::{MnyError, Result};

use super::{rc4_verify, EncodingKey};

/// Outcome of the header test-bytes check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// Test bytes decrypt to the base salt.
    Verified,
    /// Test bytes decrypt to something else: wrong password.
    Rejected,
    /// Test bytes are all zero; the caller must validate a decrypted page instead.
    Inconclusive,
}

fn read_salt(page0: &[u8]) -> Result<[u8; SALT_LEN]> {
    if page0.len() < HDR_OFF_SALT + SALT_LEN {
        return Err(MnyError::page(0, "header too short for salt"));
    }
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&page0[HDR_OFF_SALT..HDR_OFF_SALT + SALT_LEN]);
    Ok(salt)
}

/// Check `key` against the 4 test bytes at `CRYPT_CHECK_START + raw_salt[0]`.
pub fn check_password(page0: &[u8], key: &EncodingKey) -> Result<PasswordCheck> {
    let salt = read_salt(page0)?;
    let off = HDR_CRYPT_CHECK_START + salt[0] as usize;
    if page0.len() < off + CRYPT_CHECK_LEN {
        return Err(MnyError::page(0, "header too short for password test bytes"));
    }

    let mut test = [0u8; CRYPT_CHECK_LEN];
    test.copy_from_slice(&page0[off..off + CRYPT_CHECK_LEN]);
    if test.iter().all(|&b| b == 0) {
        debug!("password test bytes at {} are blank; verification inconclusive", off);
        return Ok(PasswordCheck::Inconclusive);
    }

    rc4_verify(key.digest(), &salt, &mut test);
    if test[..] == *key.base_salt() {
        Ok(PasswordCheck::Verified)
    } else {
        Ok(PasswordCheck::Rejected)
    }
}

/// Boolean form: true only when the test bytes positively match.
pub fn verify_password(page0: &[u8], key: &EncodingKey) -> Result<bool> {
    Ok(check_password(page0, key)? == PasswordCheck::Verified)
}
