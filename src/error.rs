//! Closed error taxonomy of the codec engine.
//!
//! - UnsupportedFormat / PageBounds — fatal for the file (or the table/page being processed);
//! - BadPassword — surfaced on its own so callers can re-prompt;
//! - RowDecode — local to one row, readers skip it and continue;
//! - UnsupportedColumnType — aborts the single index being keyed;
//! - MissingCapability — the data needs a code path that does not exist yet.

use std::fmt;
use thiserror::Error;

/// Unfinished code paths. Data requiring one of these fails with
/// [`MnyError::MissingCapability`] instead of producing an incomplete file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Writing non-null variable-length columns (text, memo, binary, GUID).
    VariableLengthWrite,
    /// Splitting an index page that has no room for a new entry.
    PageSplit,
    /// Allocating a fresh data page (usage maps are not maintained).
    DataPageAllocation,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::VariableLengthWrite => "variable-length column write",
            Capability::PageSplit => "index page split",
            Capability::DataPageAllocation => "data page allocation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum MnyError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("bad password")]
    BadPassword,

    #[error("row decode failed (page {page}, row {row}): {reason}")]
    RowDecode { page: u32, row: u16, reason: String },

    #[error("unsupported column type 0x{type_tag:02x} for column '{column}'")]
    UnsupportedColumnType { column: String, type_tag: u8 },

    #[error("malformed page {page}: {reason}")]
    PageBounds { page: u32, reason: String },

    #[error("missing capability: {capability} ({detail})")]
    MissingCapability { capability: Capability, detail: String },

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("index '{index}' not found in table '{table}'")]
    IndexNotFound { table: String, index: String },

    #[error("value out of range for column '{column}': {reason}")]
    ValueOutOfRange { column: String, reason: String },

    #[error("entry already present in index '{index}'")]
    DuplicateIndexEntry { index: String },

    #[error("unique index '{index}' already holds this key")]
    UniqueViolation { index: String },

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MnyError>;

impl MnyError {
    pub(crate) fn page(page: u32, reason: impl Into<String>) -> Self {
        MnyError::PageBounds {
            page,
            reason: reason.into(),
        }
    }

    pub(crate) fn format(reason: impl Into<String>) -> Self {
        MnyError::UnsupportedFormat(reason.into())
    }

    pub(crate) fn missing(capability: Capability, detail: impl Into<String>) -> Self {
        MnyError::MissingCapability {
            capability,
            detail: detail.into(),
        }
    }

    #[inline]
    pub fn is_bad_password(&self) -> bool {
        matches!(self, MnyError::BadPassword)
    }

    /// Errors that only concern one row; table reads skip and continue.
    #[inline]
    pub fn is_row_local(&self) -> bool {
        matches!(self, MnyError::RowDecode { .. })
    }
}
