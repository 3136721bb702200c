//! Centralized configuration for the .mny engine.
//!
//! Goals:
//! - Single place for tunables instead of scattering env lookups.
//! - MnyConfig::from_env() reads MNY_* variables; fluent setters override them.
//! - Passwords are never part of the configuration.
//!
//! Defaults:
//! - data_fsync = true (fsync the scratch copy before it replaces the original)
//! - scratch_dir = None (scratch copy lives next to the target file)
//! - structural_fallback = true (blank test bytes → validate decrypted page 1)
//! - strict_rows = false (undecodable rows are skipped)
//! - max_index_depth = 8

use std::fmt;

#[derive(Clone, Debug)]
pub struct MnyConfig {
    /// fsync the scratch copy before rename.
    /// Env: MNY_DATA_FSYNC (default true; "0|false|off|no" => false)
    pub data_fsync: bool,

    /// Directory for the scratch copy used by commit().
    /// Env: MNY_SCRATCH_DIR (default: the target file's directory; on failure commit retries there)
    pub scratch_dir: Option<String>,

    /// Allow the page-1 tag check when the header test bytes are blank.
    /// Env: MNY_STRUCTURAL_FALLBACK (default true)
    pub structural_fallback: bool,

    /// Fail the whole table read on the first undecodable row.
    /// Env: MNY_STRICT_ROWS (default false)
    pub strict_rows: bool,

    /// Maximum node levels walked while descending an index.
    /// Env: MNY_MAX_INDEX_DEPTH (default 8)
    pub max_index_depth: usize,
}

impl Default for MnyConfig {
    fn default() -> Self {
        Self {
            data_fsync: true,
            scratch_dir: None,
            structural_fallback: true,
            strict_rows: false,
            max_index_depth: 8,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    let s = v.trim().to_ascii_lowercase();
    if s == "1" || s == "true" || s == "on" || s == "yes" {
        Some(true)
    } else if s == "0" || s == "false" || s == "off" || s == "no" {
        Some(false)
    } else {
        None
    }
}

impl MnyConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(on) = env_flag("MNY_DATA_FSYNC") {
            cfg.data_fsync = on;
        }

        if let Ok(v) = std::env::var("MNY_SCRATCH_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.scratch_dir = Some(s.to_string());
            }
        }

        if let Some(on) = env_flag("MNY_STRUCTURAL_FALLBACK") {
            cfg.structural_fallback = on;
        }

        if let Some(on) = env_flag("MNY_STRICT_ROWS") {
            cfg.strict_rows = on;
        }

        if let Ok(v) = std::env::var("MNY_MAX_INDEX_DEPTH") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.max_index_depth = n;
                }
            }
        }

        cfg
    }

    pub fn with_data_fsync(mut self, on: bool) -> Self {
        self.data_fsync = on;
        self
    }

    pub fn with_scratch_dir<S: Into<String>>(mut self, dir: Option<S>) -> Self {
        self.scratch_dir = dir.map(Into::into);
        self
    }

    pub fn with_structural_fallback(mut self, on: bool) -> Self {
        self.structural_fallback = on;
        self
    }

    pub fn with_strict_rows(mut self, on: bool) -> Self {
        self.strict_rows = on;
        self
    }

    pub fn with_max_index_depth(mut self, depth: usize) -> Self {
        self.max_index_depth = depth.max(1);
        self
    }
}

impl fmt::Display for MnyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MnyConfig {{ \
             data_fsync: {}, \
             scratch_dir: {}, \
             structural_fallback: {}, \
             strict_rows: {}, \
             max_index_depth: {} \
             }}",
            self.data_fsync,
            self.scratch_dir
                .as_deref()
                .unwrap_or("default(<file dir>)"),
            self.structural_fallback,
            self.strict_rows,
            self.max_index_depth,
        )
    }
}
