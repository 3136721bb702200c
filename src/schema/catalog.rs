//! schema/catalog — tdef page chains and the system catalog.
//!
//! The catalog table lives at tdef page 2. Each of its rows describes one
//! object; rows with `Type == 1` are tables and `Id & 0x00FFFFFF` is the
//! table's tdef page. Lookups by name are case-insensitive.

use byteorder::{ByteOrder, LittleEndian};
use std::collections::HashSet;

use crate::consts::{
    CATALOG_ID_PAGE_MASK, CATALOG_OBJECT_TYPE_TABLE, PAGE_TYPE_TDEF, TDEF_CONTINUATION_START,
    TDEF_OFF_NEXT_PAGE,
};
use crate::error::{MnyError, Result};
use crate::pager::Pager;
use crate::row::{Row, Value};

/// Read a tdef and its continuation pages as one contiguous buffer.
pub fn read_tdef_bytes(pager: &mut Pager, tdef_page: u32) -> Result<Vec<u8>> {
    let first = pager.read_page(tdef_page)?;
    if first[0] != PAGE_TYPE_TDEF {
        return Err(MnyError::format(format!(
            "page {} has tag 0x{:02x}, expected a table definition",
            tdef_page, first[0]
        )));
    }
    let mut next = LittleEndian::read_u32(&first[TDEF_OFF_NEXT_PAGE..TDEF_OFF_NEXT_PAGE + 4]);
    let mut out = first;
    let mut seen = HashSet::new();
    seen.insert(tdef_page);
    while next != 0 {
        if !seen.insert(next) {
            return Err(MnyError::page(next, "table definition chain loops"));
        }
        let page = pager.read_page(next)?;
        if page[0] != PAGE_TYPE_TDEF {
            return Err(MnyError::page(
                next,
                format!("continuation page has tag 0x{:02x}", page[0]),
            ));
        }
        out.extend_from_slice(&page[TDEF_CONTINUATION_START..]);
        next = LittleEndian::read_u32(&page[TDEF_OFF_NEXT_PAGE..TDEF_OFF_NEXT_PAGE + 4]);
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub tdef_page: u32,
    pub system: bool,
}

/// Table name → tdef page, built from the catalog table's rows.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut entries = Vec::new();
        for row in rows {
            let is_table = matches!(row.get("Type"), Some(Value::Integer(t)) if *t == CATALOG_OBJECT_TYPE_TABLE);
            if !is_table {
                continue;
            }
            let (Some(Value::Integer(id)), Some(Value::Text(name))) = (row.get("Id"), row.get("Name"))
            else {
                continue;
            };
            let tdef_page = (id & CATALOG_ID_PAGE_MASK) as u32;
            if tdef_page == 0 {
                continue;
            }
            entries.push(CatalogEntry {
                system: name
                    .get(..4)
                    .map_or(false, |p| p.eq_ignore_ascii_case("MSys")),
                name: name.clone(),
                tdef_page,
            });
        }
        Self { entries }
    }

    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn lookup(&self, name: &str) -> Result<&CatalogEntry> {
        self.find(name)
            .ok_or_else(|| MnyError::TableNotFound(name.to_string()))
    }

    /// User tables, in catalog order.
    pub fn user_tables(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| !e.system)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(id: i64, name: &str, ty: i64) -> Row {
        Row::new()
            .with("Id", Value::Integer(id))
            .with("Name", Value::Text(name.to_string()))
            .with("Type", Value::Integer(ty))
    }

    #[test]
    fn only_table_objects_are_listed() {
        let rows = vec![
            obj(0x0100_0002, "MSysObjects", 1),
            obj(0x0000_0010, "ACCT", 1),
            obj(0x0000_0011, "qryBalance", 5),
            obj(0x0200_0012, "TRN", 1),
        ];
        let cat = Catalog::from_rows(&rows);
        let users: Vec<_> = cat.user_tables().map(|e| e.name.as_str()).collect();
        assert_eq!(users, vec!["ACCT", "TRN"]);
        assert_eq!(cat.lookup("trn").unwrap().tdef_page, 0x12);
        assert_eq!(cat.lookup("msysobjects").unwrap().tdef_page, 2);
        assert!(matches!(cat.lookup("qryBalance"), Err(MnyError::TableNotFound(_))));
    }
}
