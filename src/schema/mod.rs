//! schema — table definitions decoded from tdef pages.
//!
//! - tdef.rs    — `parse_table_definition`: header, columns, names, indexes.
//! - catalog.rs — tdef page chains and the system catalog (table name → tdef page).

pub mod catalog;
pub mod tdef;

pub use catalog::{read_tdef_bytes, Catalog, CatalogEntry};
pub use tdef::parse_table_definition;

use std::fmt;

use crate::consts::{
    COL_FLAG_AUTONUMBER, COL_FLAG_FIXED, COL_FLAG_NULLABLE, IDX_FLAG_IGNORE_NULLS,
    IDX_FLAG_REQUIRED, IDX_FLAG_UNIQUE, TABLE_TYPE_SYSTEM,
};

/// Column type tags as stored in the column record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    Byte,
    Int,
    Long,
    Money,
    Float,
    Double,
    DateTime,
    Binary,
    Text,
    Ole,
    Memo,
    Guid,
    Numeric,
    Complex,
    BigInt,
    Unknown(u8),
}

impl ColumnType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0x01 => ColumnType::Bool,
            0x02 => ColumnType::Byte,
            0x03 => ColumnType::Int,
            0x04 => ColumnType::Long,
            0x05 => ColumnType::Money,
            0x06 => ColumnType::Float,
            0x07 => ColumnType::Double,
            0x08 => ColumnType::DateTime,
            0x09 => ColumnType::Binary,
            0x0A => ColumnType::Text,
            0x0B => ColumnType::Ole,
            0x0C => ColumnType::Memo,
            0x0F => ColumnType::Guid,
            0x10 => ColumnType::Numeric,
            0x11 => ColumnType::Complex,
            0x12 => ColumnType::BigInt,
            other => ColumnType::Unknown(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            ColumnType::Bool => 0x01,
            ColumnType::Byte => 0x02,
            ColumnType::Int => 0x03,
            ColumnType::Long => 0x04,
            ColumnType::Money => 0x05,
            ColumnType::Float => 0x06,
            ColumnType::Double => 0x07,
            ColumnType::DateTime => 0x08,
            ColumnType::Binary => 0x09,
            ColumnType::Text => 0x0A,
            ColumnType::Ole => 0x0B,
            ColumnType::Memo => 0x0C,
            ColumnType::Guid => 0x0F,
            ColumnType::Numeric => 0x10,
            ColumnType::Complex => 0x11,
            ColumnType::BigInt => 0x12,
            ColumnType::Unknown(t) => t,
        }
    }

    /// Storage width for fixed-length types; None for variable/unknown ones.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            ColumnType::Bool => Some(0),
            ColumnType::Byte => Some(1),
            ColumnType::Int => Some(2),
            ColumnType::Long | ColumnType::Float | ColumnType::Complex => Some(4),
            ColumnType::Money
            | ColumnType::Double
            | ColumnType::DateTime
            | ColumnType::BigInt => Some(8),
            ColumnType::Guid => Some(16),
            ColumnType::Numeric => Some(17),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Unknown(t) => write!(f, "unknown(0x{:02x})", t),
            other => write!(f, "{}", format!("{:?}", other).to_ascii_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub col_type: ColumnType,
    /// Column number; bit position in the row null mask.
    pub col_num: u16,
    /// Slot in the row's variable-offset table (variable columns only).
    pub var_slot: u16,
    pub flags: u8,
    /// Offset inside the fixed area (fixed columns only).
    pub fixed_offset: u16,
    pub size: u16,
}

impl ColumnDefinition {
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.flags & COL_FLAG_FIXED != 0
    }

    #[inline]
    pub fn is_variable(&self) -> bool {
        !self.is_fixed()
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.flags & COL_FLAG_NULLABLE != 0
    }

    #[inline]
    pub fn is_autonumber(&self) -> bool {
        self.flags & COL_FLAG_AUTONUMBER != 0
    }
}

/// One key column of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexColumn {
    /// Position in `TableDefinition::columns`.
    pub column: usize,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    /// Real-index number (position in the tdef real-index arrays).
    pub number: usize,
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub root_page: u32,
    pub usage_map: u32,
    pub flags: u8,
    pub primary_key: bool,
    /// Entry counter from the 12-byte real-index block.
    pub entry_count: u32,
    /// Byte offset of that counter inside the first tdef page.
    pub entry_count_offset: usize,
}

impl IndexDefinition {
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.primary_key || self.flags & IDX_FLAG_UNIQUE != 0
    }

    #[inline]
    pub fn ignores_nulls(&self) -> bool {
        self.flags & IDX_FLAG_IGNORE_NULLS != 0
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.flags & IDX_FLAG_REQUIRED != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub tdef_page: u32,
    pub table_type: u8,
    pub row_count: u32,
    pub max_cols: u16,
    pub var_cols: u16,
    pub usage_map: u32,
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.name.eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn has_variable_columns(&self) -> bool {
        self.columns.iter().any(|c| c.is_variable())
    }

    #[inline]
    pub fn is_system(&self) -> bool {
        self.table_type == TABLE_TYPE_SYSTEM
    }

    /// Column count written at the head of every row.
    pub fn row_column_count(&self) -> usize {
        let by_num = self
            .columns
            .iter()
            .map(|c| c.col_num as usize + 1)
            .max()
            .unwrap_or(0);
        by_num.max(self.max_cols as usize)
    }

    /// Bytes covered by fixed-length columns (end of the furthest one).
    pub fn fixed_area_len(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.is_fixed())
            .map(|c| c.fixed_offset as usize + c.size as usize)
            .max()
            .unwrap_or(0)
    }
}
