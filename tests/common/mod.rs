//! Синтетические .mny файлы для интеграционных тестов.
//!
//! Стандартная раскладка (24 страницы):
//! - 0        заголовок (MSISAM, соль SALT, тестовые байты пароля)
//! - 1        usage map (тег 0x05) — для структурной проверки пароля
//! - 2, 3     MSysObjects: tdef + страница данных каталога
//! - 4, 5, 6  ACCT: tdef, данные, лист индекса "hacct" (всё зашифровано)
//! - 16       TRN tdef
//! - 17       лист PK "htrn"
//! - 18       node индекса "dt" (desc): один child 19 + tail 20
//! - 19, 20   листья "dt"
//! - 22       данные TRN (одна строка: htrn=1, amt=1.0000, dt=45000)

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use rc4::consts::U24;
use rc4::{KeyInit, Rc4, StreamCipher};

use mnykit::consts::*;
use mnykit::page::{data_append_row, data_page_init, IndexEntry, IndexPage};
use mnykit::row::encode_row;
use mnykit::{
    crypt_page, derive_key, encode_key, parse_table_definition, ColumnType, Currency, DigestKind,
    OleDate, Row, RowLocator, TableDefinition, Value,
};

pub const SALT: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
pub const PASSWORD: &str = "secret";
pub const PAGES: usize = 24;

pub const ACCT_TDEF: u32 = 4;
pub const ACCT_DATA: u32 = 5;
pub const ACCT_PK_LEAF: u32 = 6;
pub const TRN_TDEF: u32 = 16;
pub const TRN_PK_LEAF: u32 = 17;
pub const TRN_DT_NODE: u32 = 18;
pub const TRN_DT_CHILD: u32 = 19;
pub const TRN_DT_TAIL: u32 = 20;
pub const TRN_DATA: u32 = 22;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn unique_path(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("mnytest-{prefix}-{pid}-{t}-{id}"));
    fs::create_dir_all(&dir).unwrap();
    dir.join("money.mny")
}

// ---------- tdef ----------

#[derive(Clone)]
pub struct ColSpec {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub col_num: u16,
    pub var_slot: u16,
    pub flags: u8,
    pub fixed_offset: u16,
    pub size: u16,
}

impl ColSpec {
    pub fn fixed(name: &'static str, t: ColumnType, num: u16, off: u16, size: u16) -> Self {
        Self {
            name,
            col_type: t,
            col_num: num,
            var_slot: 0,
            flags: COL_FLAG_FIXED | COL_FLAG_NULLABLE,
            fixed_offset: off,
            size,
        }
    }

    pub fn var(name: &'static str, t: ColumnType, num: u16, slot: u16, size: u16) -> Self {
        Self {
            name,
            col_type: t,
            col_num: num,
            var_slot: slot,
            flags: COL_FLAG_NULLABLE,
            fixed_offset: 0,
            size,
        }
    }
}

#[derive(Clone)]
pub struct IdxSpec {
    pub name: &'static str,
    /// (col_num, ascending)
    pub columns: Vec<(u16, bool)>,
    pub root_page: u32,
    pub flags: u8,
    pub primary_key: bool,
    pub entry_count: u32,
}

#[derive(Clone)]
pub struct TableSpec {
    pub table_type: u8,
    pub row_count: u32,
    pub columns: Vec<ColSpec>,
    pub indexes: Vec<IdxSpec>,
    /// Мусор между именами колонок и определениями индексов.
    pub index_gap: usize,
}

fn push_name(out: &mut Vec<u8>, name: &str) {
    let units: Vec<u8> = name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    out.extend_from_slice(&(units.len() as u16).to_le_bytes());
    out.extend_from_slice(&units);
}

/// Полная страница tdef (одностраничная цепочка).
pub fn tdef_page(t: &TableSpec) -> Vec<u8> {
    let mut out = tdef_bytes(t);
    assert!(out.len() <= PAGE_SIZE, "tdef does not fit one page");
    out.resize(PAGE_SIZE, 0);
    out
}

/// Логическое определение без выравнивания по странице (может быть > 4096).
pub fn tdef_bytes(t: &TableSpec) -> Vec<u8> {
    let mut out = vec![0u8; TDEF_HEADER_LEN];
    out[0] = PAGE_TYPE_TDEF;
    out[1] = 0x01;
    LittleEndian::write_u32(&mut out[TDEF_OFF_ROW_COUNT..], t.row_count);
    out[TDEF_OFF_TABLE_TYPE] = t.table_type;
    let max_cols = t.columns.iter().map(|c| c.col_num + 1).max().unwrap_or(0);
    let var_cols = t.columns.iter().filter(|c| c.flags & COL_FLAG_FIXED == 0).count() as u16;
    LittleEndian::write_u16(&mut out[TDEF_OFF_MAX_COLS..], max_cols);
    LittleEndian::write_u16(&mut out[TDEF_OFF_VAR_COLS..], var_cols);
    LittleEndian::write_u16(&mut out[TDEF_OFF_NUM_COLS..], t.columns.len() as u16);
    LittleEndian::write_u32(&mut out[TDEF_OFF_NUM_IDX..], t.indexes.len() as u32);
    LittleEndian::write_u32(&mut out[TDEF_OFF_NUM_REAL_IDX..], t.indexes.len() as u32);

    for idx in &t.indexes {
        let mut b = [0u8; TDEF_REAL_IDX_BLOCK_LEN];
        LittleEndian::write_u32(&mut b[0..4], MAGIC_INDEX_NUMBER);
        LittleEndian::write_u32(&mut b[4..8], idx.entry_count);
        out.extend_from_slice(&b);
    }
    for c in &t.columns {
        let mut b = [0u8; TDEF_COLUMN_LEN];
        b[0] = c.col_type.tag();
        LittleEndian::write_u32(&mut b[1..5], MAGIC_TABLE_NUMBER);
        LittleEndian::write_u16(&mut b[5..7], c.col_num);
        LittleEndian::write_u16(&mut b[7..9], c.var_slot);
        b[15] = c.flags;
        LittleEndian::write_u16(&mut b[21..23], c.fixed_offset);
        LittleEndian::write_u16(&mut b[23..25], c.size);
        out.extend_from_slice(&b);
    }
    for c in &t.columns {
        push_name(&mut out, c.name);
    }
    out.extend(std::iter::repeat(0xAA).take(t.index_gap));
    for idx in &t.indexes {
        let mut b = [0u8; TDEF_REAL_IDX_DEF_LEN];
        LittleEndian::write_u32(&mut b[0..4], MAGIC_INDEX_NUMBER);
        for k in 0..TDEF_IDX_MAX_COLUMNS {
            let e = 4 + k * 3;
            match idx.columns.get(k) {
                Some(&(num, asc)) => {
                    LittleEndian::write_u16(&mut b[e..e + 2], num);
                    b[e + 2] = if asc { IDX_ORDER_ASCENDING } else { 0 };
                }
                None => LittleEndian::write_u16(&mut b[e..e + 2], IDX_UNUSED_COLUMN),
            }
        }
        LittleEndian::write_u32(&mut b[38..42], idx.root_page);
        b[42] = idx.flags;
        out.extend_from_slice(&b);
    }
    for (i, idx) in t.indexes.iter().enumerate() {
        let mut b = [0u8; TDEF_LOGICAL_IDX_LEN];
        LittleEndian::write_u32(&mut b[8..12], i as u32);
        b[23] = if idx.primary_key { IDX_TYPE_PRIMARY_KEY } else { 0 };
        out.extend_from_slice(&b);
    }
    for idx in &t.indexes {
        push_name(&mut out, idx.name);
    }
    out
}

pub fn catalog_spec() -> TableSpec {
    TableSpec {
        table_type: TABLE_TYPE_SYSTEM,
        row_count: 4,
        columns: vec![
            ColSpec::fixed("Id", ColumnType::Long, 0, 0, 4),
            ColSpec::fixed("Type", ColumnType::Int, 1, 4, 2),
            ColSpec::var("Name", ColumnType::Text, 2, 0, 510),
        ],
        indexes: vec![],
        index_gap: 0,
    }
}

pub fn trn_spec() -> TableSpec {
    let mut htrn = ColSpec::fixed("htrn", ColumnType::Long, 0, 0, 4);
    htrn.flags = COL_FLAG_FIXED;
    TableSpec {
        table_type: TABLE_TYPE_USER,
        row_count: 1,
        columns: vec![
            htrn,
            ColSpec::fixed("amt", ColumnType::Money, 1, 4, 8),
            ColSpec::fixed("dt", ColumnType::DateTime, 2, 12, 8),
            ColSpec::fixed("cleared", ColumnType::Bool, 3, 20, 1),
            ColSpec::var("memo", ColumnType::Text, 4, 0, 510),
        ],
        indexes: vec![
            IdxSpec {
                name: "htrn",
                columns: vec![(0, true)],
                root_page: TRN_PK_LEAF,
                flags: IDX_FLAG_UNIQUE,
                primary_key: true,
                entry_count: 1,
            },
            IdxSpec {
                name: "dt",
                columns: vec![(2, false)],
                root_page: TRN_DT_NODE,
                flags: IDX_FLAG_IGNORE_NULLS,
                primary_key: false,
                entry_count: 1,
            },
            IdxSpec {
                name: "memo",
                columns: vec![(4, true)],
                root_page: TRN_DT_TAIL + 1,
                flags: IDX_FLAG_IGNORE_NULLS,
                primary_key: false,
                entry_count: 0,
            },
        ],
        index_gap: 6,
    }
}

pub fn acct_spec() -> TableSpec {
    let mut hacct = ColSpec::fixed("hacct", ColumnType::Long, 0, 0, 4);
    hacct.flags = COL_FLAG_FIXED;
    TableSpec {
        table_type: TABLE_TYPE_USER,
        row_count: 2,
        columns: vec![
            hacct,
            ColSpec::fixed("open", ColumnType::Bool, 1, 4, 0),
            ColSpec::fixed("balance", ColumnType::Money, 2, 4, 8),
        ],
        indexes: vec![IdxSpec {
            name: "hacct",
            columns: vec![(0, true)],
            root_page: ACCT_PK_LEAF,
            flags: IDX_FLAG_UNIQUE,
            primary_key: true,
            entry_count: 2,
        }],
        index_gap: 0,
    }
}

pub fn definition(spec: &TableSpec, tdef_page_no: u32, name: &str) -> TableDefinition {
    let mut def = parse_table_definition(tdef_page_no, &tdef_page(spec)).unwrap();
    def.name = name.to_string();
    def
}

// ---------- rows ----------

/// Строка с переменными колонками вручную: фиксированная часть, данные,
/// таблица смещений (в обратном порядке), число переменных колонок, маска.
pub fn frame(col_count: u16, fixed: &[u8], vars: &[&[u8]], present: &[u16]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&col_count.to_le_bytes());
    out.extend_from_slice(fixed);
    let mut offsets = vec![out.len() as u16];
    for v in vars {
        out.extend_from_slice(v);
        offsets.push(out.len() as u16);
    }
    for off in offsets.iter().rev() {
        out.extend_from_slice(&off.to_le_bytes());
    }
    out.extend_from_slice(&(vars.len() as u16).to_le_bytes());
    let mut mask = vec![0u8; (col_count as usize + 7) / 8];
    for &n in present {
        mask[n as usize / 8] |= 1 << (n % 8);
    }
    out.extend_from_slice(&mask);
    out
}

pub fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

fn catalog_row(id: u32, kind: i16, name: &str) -> Vec<u8> {
    let mut fixed = [0u8; 6];
    LittleEndian::write_u32(&mut fixed[0..4], id);
    LittleEndian::write_i16(&mut fixed[4..6], kind);
    frame(3, &fixed, &[&utf16(name)], &[0, 1, 2])
}

pub fn trn_row(htrn: i64, amt_raw: i64, dt: f64) -> Row {
    Row::new()
        .with("htrn", Value::Integer(htrn))
        .with("amt", Value::Currency(Currency(amt_raw)))
        .with("dt", Value::Date(OleDate(dt)))
}

// ---------- file ----------

pub struct MnyBuilder {
    pub pages: Vec<Vec<u8>>,
    pub digest: DigestKind,
    pub blank_test_bytes: bool,
}

impl MnyBuilder {
    pub fn new(n_pages: usize) -> Self {
        Self {
            pages: vec![vec![0u8; PAGE_SIZE]; n_pages],
            digest: DigestKind::Sha1,
            blank_test_bytes: false,
        }
    }

    /// Стандартный файл с каталогом, ACCT и TRN.
    pub fn money() -> Self {
        let mut b = Self::new(PAGES);
        b.pages[1][0] = PAGE_TYPE_USAGE_MAP;
        b.pages[1][1] = 0x01;

        b.pages[CATALOG_TDEF_PAGE as usize] = tdef_page(&catalog_spec());
        let mut cat = vec![0u8; PAGE_SIZE];
        data_page_init(&mut cat, CATALOG_TDEF_PAGE);
        for raw in [
            catalog_row(CATALOG_TDEF_PAGE, 1, "MSysObjects"),
            catalog_row(0x0A00_0000 | TRN_TDEF, 1, "TRN"),
            catalog_row(ACCT_TDEF, 1, "ACCT"),
            catalog_row(30, 3, "Reports"),
        ] {
            data_append_row(&mut cat, 3, &raw).unwrap();
        }
        b.pages[3] = cat;

        // ACCT
        let acct = acct_spec();
        let acct_def = definition(&acct, ACCT_TDEF, "ACCT");
        b.pages[ACCT_TDEF as usize] = tdef_page(&acct);
        let mut data = vec![0u8; PAGE_SIZE];
        data_page_init(&mut data, ACCT_TDEF);
        let mut leaf = IndexPage::new_leaf(ACCT_PK_LEAF, ACCT_TDEF);
        for (h, open) in [(1i64, true), (2, false)] {
            let row = Row::new()
                .with("hacct", Value::Integer(h))
                .with("open", Value::Bool(open))
                .with("balance", Value::Currency(Currency(h * 10_000)));
            let raw = encode_row(&row, &acct_def).unwrap();
            let slot = data_append_row(&mut data, ACCT_DATA, &raw).unwrap().unwrap();
            let key = encode_key(&row, &acct_def.indexes[0], &acct_def).unwrap().unwrap();
            leaf.entries.push(IndexEntry::leaf(
                key.bytes,
                RowLocator { page: ACCT_DATA, row: slot },
            ));
        }
        b.pages[ACCT_DATA as usize] = data;
        b.pages[ACCT_PK_LEAF as usize] = leaf.encode().unwrap();

        // TRN
        let trn = trn_spec();
        let trn_def = definition(&trn, TRN_TDEF, "TRN");
        b.pages[TRN_TDEF as usize] = tdef_page(&trn);
        let row = trn_row(1, 10_000, 45_000.0);
        let raw = encode_row(&row, &trn_def).unwrap();
        let mut data = vec![0u8; PAGE_SIZE];
        data_page_init(&mut data, TRN_TDEF);
        let slot = data_append_row(&mut data, TRN_DATA, &raw).unwrap().unwrap();
        b.pages[TRN_DATA as usize] = data;
        let loc = RowLocator { page: TRN_DATA, row: slot };

        let pk = encode_key(&row, &trn_def.indexes[0], &trn_def).unwrap().unwrap();
        let mut leaf = IndexPage::new_leaf(TRN_PK_LEAF, TRN_TDEF);
        leaf.entries.push(IndexEntry::leaf(pk.bytes, loc));
        b.pages[TRN_PK_LEAF as usize] = leaf.encode().unwrap();

        let dt = encode_key(&row, &trn_def.indexes[1], &trn_def).unwrap().unwrap();
        let mut node = IndexPage::new_node(TRN_DT_NODE, TRN_TDEF, TRN_DT_TAIL);
        node.entries.push(IndexEntry::node(dt.bytes.clone(), loc, TRN_DT_CHILD));
        b.pages[TRN_DT_NODE as usize] = node.encode().unwrap();
        let mut child = IndexPage::new_leaf(TRN_DT_CHILD, TRN_TDEF);
        child.next_page = TRN_DT_TAIL;
        child.entries.push(IndexEntry::leaf(dt.bytes, loc));
        b.pages[TRN_DT_CHILD as usize] = child.encode().unwrap();
        let mut tail = IndexPage::new_leaf(TRN_DT_TAIL, TRN_TDEF);
        tail.prev_page = TRN_DT_CHILD;
        b.pages[TRN_DT_TAIL as usize] = tail.encode().unwrap();

        let memo_leaf = IndexPage::new_leaf(TRN_DT_TAIL + 1, TRN_TDEF);
        b.pages[(TRN_DT_TAIL + 1) as usize] = memo_leaf.encode().unwrap();
        b
    }

    pub fn with_digest(mut self, d: DigestKind) -> Self {
        self.digest = d;
        self
    }

    pub fn with_blank_test_bytes(mut self) -> Self {
        self.blank_test_bytes = true;
        self
    }

    fn header(&self, password: &str) -> Vec<u8> {
        let mut p = vec![0u8; PAGE_SIZE];
        p[0] = PAGE_TYPE_HEADER;
        p[HDR_OFF_FORMAT_ID..HDR_OFF_FORMAT_ID + 16].copy_from_slice(HDR_FORMAT_MSISAM);
        LittleEndian::write_u32(&mut p[HDR_OFF_VERSION..], 1);
        p[HDR_OFF_SALT..HDR_OFF_SALT + SALT_LEN].copy_from_slice(&SALT);
        let flags = match self.digest {
            DigestKind::Sha1 => FLAG_NEW_ENCRYPTION | FLAG_USE_SHA1,
            DigestKind::Md5 => FLAG_NEW_ENCRYPTION,
        };
        LittleEndian::write_u32(&mut p[HDR_OFF_CRYPT_FLAGS..], flags);

        if !self.blank_test_bytes {
            let key = derive_key(password, &SALT, self.digest);
            let mut rc4_key = [0u8; 24];
            rc4_key[..16].copy_from_slice(key.digest());
            rc4_key[16..].copy_from_slice(&SALT);
            let mut test = [0u8; 4];
            test.copy_from_slice(key.base_salt());
            let mut rc4 = Rc4::<U24>::new_from_slice(&rc4_key).unwrap();
            rc4.apply_keystream(&mut test);
            let off = HDR_CRYPT_CHECK_START + SALT[0] as usize;
            p[off..off + 4].copy_from_slice(&test);
        }
        p
    }

    /// Зашифровать страницы 1..=14 ключом пароля и записать файл.
    pub fn write(&self, path: &std::path::Path, password: &str) -> Result<()> {
        let key = derive_key(password, &SALT, self.digest);
        let mut out = Vec::with_capacity(self.pages.len() * PAGE_SIZE);
        out.extend_from_slice(&self.header(password));
        for (no, page) in self.pages.iter().enumerate().skip(1) {
            let mut buf = page.clone();
            crypt_page(&key, &mut buf, no as u32);
            out.extend_from_slice(&buf);
        }
        fs::write(path, out)?;
        Ok(())
    }
}

/// Стандартный файл по уникальному пути.
pub fn money_file(prefix: &str) -> Result<PathBuf> {
    let path = unique_path(prefix);
    MnyBuilder::money().write(&path, PASSWORD)?;
    Ok(path)
}
