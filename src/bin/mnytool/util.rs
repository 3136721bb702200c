use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use mnykit::{MnyError, MnyFile};

/// --password, else MNY_PASSWORD, else empty. Never persisted.
pub fn resolve_password(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var("MNY_PASSWORD").ok())
        .unwrap_or_default()
}

pub fn open_file(path: &Path, password: Option<String>) -> Result<MnyFile> {
    let pw = resolve_password(password);
    match MnyFile::open(path, &pw) {
        Ok(f) => Ok(f),
        Err(MnyError::BadPassword) => Err(anyhow!("bad password for {}", path.display())),
        Err(e) => Err(e).with_context(|| format!("open {}", path.display())),
    }
}

/// JSON object from --values-json or --values-file (exactly one).
pub fn read_values(
    inline: Option<String>,
    file: Option<PathBuf>,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let text = match (inline, file) {
        (Some(s), None) => s,
        (None, Some(p)) => std::fs::read_to_string(&p)
            .with_context(|| format!("read values file {}", p.display()))?,
        (Some(_), Some(_)) => return Err(anyhow!("use either --values-json or --values-file")),
        (None, None) => return Err(anyhow!("provide --values-json or --values-file")),
    };
    match serde_json::from_str::<serde_json::Value>(&text).context("parse values JSON")? {
        serde_json::Value::Object(m) => Ok(m),
        other => Err(anyhow!("values must be a JSON object, got {}", other)),
    }
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
