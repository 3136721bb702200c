//! page/index — страницы индекса (0x03 node / 0x04 leaf): decode/encode.
//!
//! Заголовок:
//! ```text
//! 0x00 u8  tag                 0x10 u32 tail child (node)
//! 0x01 u8  0x01                0x14 u16 длина общего префикса
//! 0x02 u16 free space          0x16 u16 число записей
//! 0x04 u32 tdef page           0x18 u16 free-space pointer
//! 0x08 u32 prev page           0x1A u8  reserved
//! 0x0C u32 next page           0x1B [249] маска записей
//! ```
//! Записи лежат в [pointer, PAGE_SIZE) подряд, первая — у pointer.
//! Бит p маски (относительно pointer) выставлен ⇔ какая‑то запись
//! заканчивается на байте p. Общий префикс хранится только в первой записи,
//! остальные его опускают и получают обратно при decode.
//!
//! Запись на диске: key ‖ locator (3 байта BE page + 1 байт row) [‖ child u32 BE].
//! decode(encode(p)) == p — инвариант; любые нарушения формы → PageBounds.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::cmp::Ordering;

use crate::consts::{
    CHILD_POINTER_LEN, IDX_ENTRY_AREA_START, IDX_ENTRY_MASK_LEN, IDX_MAX_ENTRY_BYTES,
    IDX_OFF_ENTRY_COUNT, IDX_OFF_ENTRY_MASK, IDX_OFF_ENTRY_START, IDX_OFF_FREE_SPACE,
    IDX_OFF_NEXT_PAGE, IDX_OFF_PREFIX_LEN, IDX_OFF_PREV_PAGE, IDX_OFF_TAIL_PAGE,
    IDX_OFF_TDEF_PAGE, PAGE_SIZE, PAGE_TYPE_INDEX_LEAF, PAGE_TYPE_INDEX_NODE, ROW_LOCATOR_LEN,
};
use crate::error::{Capability, MnyError, Result};
use crate::row::RowLocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPageKind {
    Node,
    Leaf,
}

impl IndexPageKind {
    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            IndexPageKind::Node => PAGE_TYPE_INDEX_NODE,
            IndexPageKind::Leaf => PAGE_TYPE_INDEX_LEAF,
        }
    }

    #[inline]
    fn suffix_len(self) -> usize {
        match self {
            IndexPageKind::Node => ROW_LOCATOR_LEN + CHILD_POINTER_LEN,
            IndexPageKind::Leaf => ROW_LOCATOR_LEN,
        }
    }
}

/// Ключ + локатор строки (+ child для node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Vec<u8>,
    pub locator: RowLocator,
    pub child: Option<u32>,
}

impl IndexEntry {
    pub fn leaf(key: Vec<u8>, locator: RowLocator) -> Self {
        Self {
            key,
            locator,
            child: None,
        }
    }

    pub fn node(key: Vec<u8>, locator: RowLocator, child: u32) -> Self {
        Self {
            key,
            locator,
            child: Some(child),
        }
    }

    /// Байты, по которым упорядочены записи: key ‖ locator.
    pub fn sort_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.key.len() + ROW_LOCATOR_LEN);
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&locator_bytes(self.locator));
        out
    }

    fn on_disk(&self) -> Vec<u8> {
        let mut out = self.sort_bytes();
        if let Some(child) = self.child {
            out.extend_from_slice(&child.to_be_bytes());
        }
        out
    }

    /// Сравнение в порядке страницы (побайтно; префикс меньше).
    #[inline]
    pub fn cmp_sort(&self, other: &IndexEntry) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| locator_bytes(self.locator).cmp(&locator_bytes(other.locator)))
    }
}

#[inline]
pub fn locator_bytes(loc: RowLocator) -> [u8; ROW_LOCATOR_LEN] {
    let p = loc.page;
    [(p >> 16) as u8, (p >> 8) as u8, p as u8, loc.row]
}

#[inline]
fn locator_from(b: &[u8]) -> RowLocator {
    RowLocator {
        page: BigEndian::read_u24(&b[0..3]),
        row: b[3],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    pub page_no: u32,
    pub kind: IndexPageKind,
    pub tdef_page: u32,
    pub prev_page: u32,
    pub next_page: u32,
    pub tail_page: u32,
    /// Длина общего префикса, объявленная в заголовке.
    pub prefix_len: usize,
    pub entries: Vec<IndexEntry>,
}

impl IndexPage {
    pub fn new_leaf(page_no: u32, tdef_page: u32) -> Self {
        Self {
            page_no,
            kind: IndexPageKind::Leaf,
            tdef_page,
            prev_page: 0,
            next_page: 0,
            tail_page: 0,
            prefix_len: 0,
            entries: Vec::new(),
        }
    }

    pub fn new_node(page_no: u32, tdef_page: u32, tail_page: u32) -> Self {
        Self {
            kind: IndexPageKind::Node,
            tail_page,
            ..Self::new_leaf(page_no, tdef_page)
        }
    }

    /// Разобрать страницу индекса с проверкой всех инвариантов формы.
    pub fn decode(page: &[u8], page_no: u32) -> Result<Self> {
        if page.len() != PAGE_SIZE {
            return Err(MnyError::page(page_no, "index page buffer has wrong size"));
        }
        let kind = match page[0] {
            PAGE_TYPE_INDEX_NODE => IndexPageKind::Node,
            PAGE_TYPE_INDEX_LEAF => IndexPageKind::Leaf,
            t => {
                return Err(MnyError::page(
                    page_no,
                    format!("tag 0x{:02x} is not an index page", t),
                ))
            }
        };
        let rd16 = |off: usize| LittleEndian::read_u16(&page[off..off + 2]) as usize;
        let rd32 = |off: usize| LittleEndian::read_u32(&page[off..off + 4]);

        let prefix_len = rd16(IDX_OFF_PREFIX_LEN);
        let count = rd16(IDX_OFF_ENTRY_COUNT);
        let ptr = rd16(IDX_OFF_ENTRY_START);
        if ptr < IDX_ENTRY_AREA_START || ptr > PAGE_SIZE {
            return Err(MnyError::page(
                page_no,
                format!("free-space pointer {} outside the entry area", ptr),
            ));
        }
        let used = PAGE_SIZE - ptr;
        if used > IDX_MAX_ENTRY_BYTES {
            return Err(MnyError::page(
                page_no,
                format!("{} entry bytes exceed the mask capacity", used),
            ));
        }

        // Концы записей из маски.
        let mask = &page[IDX_OFF_ENTRY_MASK..IDX_OFF_ENTRY_MASK + IDX_ENTRY_MASK_LEN];
        let mut ends = Vec::with_capacity(count);
        for (byte_i, &b) in mask.iter().enumerate() {
            if b == 0 {
                continue;
            }
            for bit in 0..8 {
                if b & (1 << bit) != 0 {
                    ends.push(byte_i * 8 + bit);
                }
            }
        }
        if ends.len() != count {
            return Err(MnyError::page(
                page_no,
                format!("entry count {} but {} mask bits set", count, ends.len()),
            ));
        }
        if ends.first() == Some(&0) {
            return Err(MnyError::page(page_no, "mask marks an empty first entry"));
        }
        if ends.last().copied().unwrap_or(0) != used {
            return Err(MnyError::page(
                page_no,
                format!("entries end at {:?}, expected {}", ends.last(), used),
            ));
        }

        let suffix = kind.suffix_len();
        let area = &page[ptr..];
        let mut entries = Vec::with_capacity(count);
        let mut prefix: Vec<u8> = Vec::new();
        let mut start = 0usize;
        for (i, &end) in ends.iter().enumerate() {
            let stored = &area[start..end];
            start = end;
            let full: Vec<u8> = if i == 0 {
                if stored.len() < prefix_len + suffix {
                    return Err(MnyError::page(
                        page_no,
                        format!("first entry ({} B) shorter than prefix {}", stored.len(), prefix_len),
                    ));
                }
                prefix = stored[..prefix_len].to_vec();
                stored.to_vec()
            } else {
                let mut v = prefix.clone();
                v.extend_from_slice(stored);
                v
            };
            if full.len() < suffix {
                return Err(MnyError::page(
                    page_no,
                    format!("entry {} ({} B) cannot hold its pointers", i, full.len()),
                ));
            }
            let key_len = full.len() - suffix;
            let locator = locator_from(&full[key_len..key_len + ROW_LOCATOR_LEN]);
            let child = match kind {
                IndexPageKind::Node => Some(BigEndian::read_u32(&full[key_len + ROW_LOCATOR_LEN..])),
                IndexPageKind::Leaf => None,
            };
            entries.push(IndexEntry {
                key: full[..key_len].to_vec(),
                locator,
                child,
            });
        }

        Ok(Self {
            page_no,
            kind,
            tdef_page: rd32(IDX_OFF_TDEF_PAGE),
            prev_page: rd32(IDX_OFF_PREV_PAGE),
            next_page: rd32(IDX_OFF_NEXT_PAGE),
            tail_page: rd32(IDX_OFF_TAIL_PAGE),
            prefix_len,
            entries,
        })
    }

    /// Префикс, который реально можно объявить: не длиннее объявленного,
    /// общий для всех записей и не заходящий в локатор.
    pub fn effective_prefix_len(&self) -> usize {
        let Some(first) = self.entries.first() else {
            return 0;
        };
        let mut n = self.prefix_len.min(first.key.len());
        for e in &self.entries[1..] {
            n = n.min(common_prefix(&first.key, &e.key));
        }
        n
    }

    /// Сколько байт займут записи после encode().
    pub fn encoded_entry_bytes(&self) -> usize {
        let prefix = self.effective_prefix_len();
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let full = e.key.len() + self.kind.suffix_len();
                if i == 0 {
                    full
                } else {
                    full - prefix
                }
            })
            .sum()
    }

    /// Собрать страницу. Не влезает в маску → MissingCapability(PageSplit).
    pub fn encode(&self) -> Result<Vec<u8>> {
        for e in &self.entries {
            if e.locator.page > 0x00FF_FFFF {
                return Err(MnyError::page(
                    self.page_no,
                    format!("row page {} does not fit a 3-byte locator", e.locator.page),
                ));
            }
            if e.child.is_some() != (self.kind == IndexPageKind::Node) {
                return Err(MnyError::page(self.page_no, "child pointer does not match page kind"));
            }
        }
        let total = self.encoded_entry_bytes();
        if total > IDX_MAX_ENTRY_BYTES {
            return Err(MnyError::missing(
                Capability::PageSplit,
                format!(
                    "index page {} needs {} entry bytes, capacity {}",
                    self.page_no, total, IDX_MAX_ENTRY_BYTES
                ),
            ));
        }
        let prefix = self.effective_prefix_len();
        let ptr = PAGE_SIZE - total;

        let mut page = vec![0u8; PAGE_SIZE];
        page[0] = self.kind.tag();
        page[1] = 0x01;
        LittleEndian::write_u16(
            &mut page[IDX_OFF_FREE_SPACE..IDX_OFF_FREE_SPACE + 2],
            (IDX_MAX_ENTRY_BYTES - total) as u16,
        );
        LittleEndian::write_u32(&mut page[IDX_OFF_TDEF_PAGE..IDX_OFF_TDEF_PAGE + 4], self.tdef_page);
        LittleEndian::write_u32(&mut page[IDX_OFF_PREV_PAGE..IDX_OFF_PREV_PAGE + 4], self.prev_page);
        LittleEndian::write_u32(&mut page[IDX_OFF_NEXT_PAGE..IDX_OFF_NEXT_PAGE + 4], self.next_page);
        LittleEndian::write_u32(&mut page[IDX_OFF_TAIL_PAGE..IDX_OFF_TAIL_PAGE + 4], self.tail_page);
        LittleEndian::write_u16(&mut page[IDX_OFF_PREFIX_LEN..IDX_OFF_PREFIX_LEN + 2], prefix as u16);
        LittleEndian::write_u16(
            &mut page[IDX_OFF_ENTRY_COUNT..IDX_OFF_ENTRY_COUNT + 2],
            self.entries.len() as u16,
        );
        LittleEndian::write_u16(&mut page[IDX_OFF_ENTRY_START..IDX_OFF_ENTRY_START + 2], ptr as u16);

        let mut pos = 0usize;
        for (i, e) in self.entries.iter().enumerate() {
            let full = e.on_disk();
            let stored = if i == 0 { &full[..] } else { &full[prefix..] };
            page[ptr + pos..ptr + pos + stored.len()].copy_from_slice(stored);
            pos += stored.len();
            page[IDX_OFF_ENTRY_MASK + pos / 8] |= 1 << (pos % 8);
        }
        Ok(page)
    }

    /// Записи строго возрастают в порядке sort_bytes.
    pub fn is_sorted(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].cmp_sort(&w[1]) == Ordering::Less)
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(page: u32, row: u8) -> RowLocator {
        RowLocator { page, row }
    }

    #[test]
    fn prefix_is_stored_once_and_restored() {
        let mut p = IndexPage::new_leaf(40, 16);
        p.prefix_len = 3;
        p.entries = vec![
            IndexEntry::leaf(vec![0x7F, 0x80, 0x00, 0x01], loc(20, 0)),
            IndexEntry::leaf(vec![0x7F, 0x80, 0x00, 0x02], loc(20, 1)),
        ];
        let bytes = p.encode().unwrap();
        // 8 bytes for the first entry, 8 - 3 for the second
        assert_eq!(LittleEndian::read_u16(&bytes[IDX_OFF_ENTRY_START..]) as usize, PAGE_SIZE - 13);
        let back = IndexPage::decode(&bytes, 40).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn prefix_shrinks_when_entries_diverge() {
        let mut p = IndexPage::new_leaf(40, 16);
        p.prefix_len = 3;
        p.entries = vec![
            IndexEntry::leaf(vec![0x7F, 0x80, 0x00, 0x01], loc(20, 0)),
            IndexEntry::leaf(vec![0x7F, 0x81, 0x00, 0x02], loc(20, 1)),
        ];
        assert_eq!(p.effective_prefix_len(), 1);
        let back = IndexPage::decode(&p.encode().unwrap(), 40).unwrap();
        assert_eq!(back.prefix_len, 1);
        assert_eq!(back.entries, p.entries);
    }

    #[test]
    fn node_entries_carry_child_pointers() {
        let mut p = IndexPage::new_node(41, 16, 77);
        p.entries = vec![IndexEntry::node(vec![0x7F, 0x01], loc(0x01_0203, 9), 55)];
        let bytes = p.encode().unwrap();
        let tail = &bytes[PAGE_SIZE - 10..];
        assert_eq!(tail, &[0x7F, 0x01, 0x01, 0x02, 0x03, 9, 0, 0, 0, 55]);
        let back = IndexPage::decode(&bytes, 41).unwrap();
        assert_eq!(back.tail_page, 77);
        assert_eq!(back.entries[0].child, Some(55));
    }

    #[test]
    fn count_mask_mismatch_is_rejected() {
        let mut p = IndexPage::new_leaf(40, 16);
        p.entries = vec![IndexEntry::leaf(vec![0x7F, 1], loc(20, 0))];
        let mut bytes = p.encode().unwrap();
        LittleEndian::write_u16(&mut bytes[IDX_OFF_ENTRY_COUNT..], 2);
        let err = IndexPage::decode(&bytes, 40).unwrap_err();
        assert!(matches!(err, MnyError::PageBounds { page: 40, .. }));
    }

    #[test]
    fn overfull_page_needs_a_split() {
        let mut p = IndexPage::new_leaf(40, 16);
        // 250 × 9 bytes > 1991
        for i in 0..250u32 {
            let mut key = vec![0x7F];
            key.extend_from_slice(&(i | 0x8000_0000).to_be_bytes());
            p.entries.push(IndexEntry::leaf(key, loc(20, i as u8)));
        }
        let err = p.encode().unwrap_err();
        assert!(matches!(
            err,
            MnyError::MissingCapability { capability: Capability::PageSplit, .. }
        ));
    }
}
