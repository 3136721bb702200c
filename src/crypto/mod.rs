//! crypto — MSISAM page cipher.
//!
//! - derive_key: uppercase password → UTF-16LE in a 40-byte buffer → SHA-1 or MD5
//!   (flag in the header) → 16-byte digest ‖ 4-byte base salt = 20-byte encoding key.
//! - page_key: the last 4 key bytes become `page_no (LE) XOR base salt`.
//! - crypt_page: RC4 over the whole page with the page key; identity for page 0 and 15+.
//!   RC4 is self-inverse, so the same call encrypts and decrypts.
//! - check_password: RC4-decrypt the 4 header test bytes with `digest ‖ raw salt (8 bytes)`
//!   and compare against the base salt, before any page is touched.
//!
//! Key bytes are zeroized on drop (same policy as the rest of our key material).

mod password;

pub use password::{check_password, verify_password, PasswordCheck};

use rc4::consts::{U20, U24};
use rc4::{KeyInit, Rc4, StreamCipher};
use sha1::{Digest, Sha1};
use md5::Md5;
use zeroize::Zeroize;

use crate::consts::{
    BASE_SALT_LEN, BASE_SALT_MASK, ENCODING_KEY_LEN, FIRST_ENCRYPTED_PAGE, LAST_ENCRYPTED_PAGE,
    PASSWORD_BUF_LEN, PASSWORD_DIGEST_LEN, SALT_LEN,
};

/// Which hash turns the password buffer into the 16-byte digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Sha1,
    Md5,
}

/// 20 bytes: password digest (16) ‖ base salt (4). Immutable for a session.
#[derive(Clone)]
pub struct EncodingKey {
    bytes: [u8; ENCODING_KEY_LEN],
}

impl EncodingKey {
    pub fn from_bytes(bytes: [u8; ENCODING_KEY_LEN]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; ENCODING_KEY_LEN] {
        &self.bytes
    }

    #[inline]
    pub fn digest(&self) -> &[u8] {
        &self.bytes[..PASSWORD_DIGEST_LEN]
    }

    #[inline]
    pub fn base_salt(&self) -> &[u8] {
        &self.bytes[PASSWORD_DIGEST_LEN..]
    }
}

impl std::fmt::Debug for EncodingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print key material
        f.write_str("EncodingKey(..)")
    }
}

impl Drop for EncodingKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Base salt: first four stored salt bytes XOR the fixed mask.
#[inline]
pub fn base_salt(file_salt: &[u8; SALT_LEN]) -> [u8; BASE_SALT_LEN] {
    let mut out = [0u8; BASE_SALT_LEN];
    for i in 0..BASE_SALT_LEN {
        out[i] = file_salt[i] ^ BASE_SALT_MASK[i];
    }
    out
}

/// Password → 40-byte buffer (uppercase, UTF-16LE, truncated, zero padded).
fn password_buffer(password: &str) -> [u8; PASSWORD_BUF_LEN] {
    let mut buf = [0u8; PASSWORD_BUF_LEN];
    let upper = password.to_uppercase();
    let mut pos = 0usize;
    for unit in upper.encode_utf16() {
        if pos + 2 > PASSWORD_BUF_LEN {
            break;
        }
        buf[pos..pos + 2].copy_from_slice(&unit.to_le_bytes());
        pos += 2;
    }
    buf
}

/// Derive the session encoding key. Deterministic.
pub fn derive_key(password: &str, file_salt: &[u8; SALT_LEN], kind: DigestKind) -> EncodingKey {
    let mut pwd = password_buffer(password);
    let mut out = [0u8; ENCODING_KEY_LEN];
    match kind {
        DigestKind::Sha1 => {
            let d = Sha1::digest(pwd);
            out[..PASSWORD_DIGEST_LEN].copy_from_slice(&d[..PASSWORD_DIGEST_LEN]);
        }
        DigestKind::Md5 => {
            let d = Md5::digest(pwd);
            out[..PASSWORD_DIGEST_LEN].copy_from_slice(&d[..PASSWORD_DIGEST_LEN]);
        }
    }
    out[PASSWORD_DIGEST_LEN..].copy_from_slice(&base_salt(file_salt));
    pwd.zeroize();
    EncodingKey::from_bytes(out)
}

/// Per-page key: tail = page_no (LE) XOR original tail; digest prefix unchanged.
pub fn page_key(key: &EncodingKey, page_no: u32) -> [u8; ENCODING_KEY_LEN] {
    let mut k = *key.as_bytes();
    let pn = page_no.to_le_bytes();
    for i in 0..4 {
        k[PASSWORD_DIGEST_LEN + i] = pn[i] ^ key.as_bytes()[PASSWORD_DIGEST_LEN + i];
    }
    k
}

#[inline]
pub fn is_encrypted_page(page_no: u32) -> bool {
    (FIRST_ENCRYPTED_PAGE..=LAST_ENCRYPTED_PAGE).contains(&page_no)
}

/// Encrypt or decrypt one page in place.
pub fn crypt_page(key: &EncodingKey, data: &mut [u8], page_no: u32) {
    if !is_encrypted_page(page_no) {
        return;
    }
    let mut k = page_key(key, page_no);
    let mut rc4 = Rc4::<U20>::new((&k).into());
    rc4.apply_keystream(data);
    k.zeroize();
}

/// RC4 with the 24-byte verification key (digest ‖ full raw salt).
pub(crate) fn rc4_verify(digest: &[u8], file_salt: &[u8; SALT_LEN], data: &mut [u8]) {
    let mut k = [0u8; PASSWORD_DIGEST_LEN + SALT_LEN];
    k[..PASSWORD_DIGEST_LEN].copy_from_slice(&digest[..PASSWORD_DIGEST_LEN]);
    k[PASSWORD_DIGEST_LEN..].copy_from_slice(file_salt);
    let mut rc4 = Rc4::<U24>::new((&k).into());
    rc4.apply_keystream(data);
    k.zeroize();
}

/// Session cipher bound to one file's key.
#[derive(Debug, Clone)]
pub struct PageCipher {
    key: EncodingKey,
}

impl PageCipher {
    pub fn new(key: EncodingKey) -> Self {
        Self { key }
    }

    #[inline]
    pub fn key(&self) -> &EncodingKey {
        &self.key
    }

    /// Decrypt a page read from disk (no-op outside 1..=14).
    #[inline]
    pub fn decrypt(&self, data: &mut [u8], page_no: u32) {
        crypt_page(&self.key, data, page_no);
    }

    /// Encrypt a page before it goes back to disk.
    #[inline]
    pub fn encrypt(&self, data: &mut [u8], page_no: u32) {
        crypt_page(&self.key, data, page_no);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn derive_key_known_vectors() {
        let k = derive_key("secret", &SALT, DigestKind::Sha1);
        assert_eq!(hex(k.as_bytes()), "1c963b676f882c7a1f28761b9251cc58036d79d0");

        let k = derive_key("secret", &SALT, DigestKind::Md5);
        assert_eq!(hex(k.as_bytes()), "ae8ad63606e6c22956d0845e75c82df9036d79d0");

        // password is uppercased first
        let a = derive_key("Secret", &SALT, DigestKind::Sha1);
        let b = derive_key("SECRET", &SALT, DigestKind::Sha1);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn empty_password_still_hashes_the_zero_buffer() {
        let k = derive_key("", &SALT, DigestKind::Sha1);
        assert_eq!(hex(k.as_bytes()), "b80de5d138758541c5f05265ad144ab9036d79d0");
    }

    #[test]
    fn page_key_only_touches_the_tail() {
        let k = derive_key("secret", &SALT, DigestKind::Sha1);
        let pk = page_key(&k, 3);
        assert_eq!(hex(&pk), "1c963b676f882c7a1f28761b9251cc58006d79d0");
        assert_eq!(&pk[..16], k.digest());
        assert_eq!(page_key(&k, 0), *k.as_bytes());
    }

    #[test]
    fn crypt_page_is_identity_outside_the_encrypted_range() {
        let k = derive_key("x", &SALT, DigestKind::Md5);
        let orig: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        for pn in [0u32, 15, 16, 1000] {
            let mut p = orig.clone();
            crypt_page(&k, &mut p, pn);
            assert_eq!(p, orig, "page {} must stay plaintext", pn);
        }
        let mut p = orig.clone();
        crypt_page(&k, &mut p, 14);
        assert_ne!(p, orig);
    }

    #[test]
    fn rc4_matches_reference_keystream() {
        // "Key" / "Plaintext" reference vector
        let mut data = *b"Plaintext";
        let mut rc4 = Rc4::<rc4::consts::U3>::new(b"Key".into());
        rc4.apply_keystream(&mut data);
        assert_eq!(hex(&data), "bbf316e8d940af0ad3");
    }
}
