//! index/btree — descend from an index root, insert into a leaf, list entries.
//!
//! Descent: on a node page follow the child of the first entry whose
//! `key ‖ locator` is >= the new one (a shorter prefix sorts first), else the
//! tail child. Leaf: binary search, insert, re-encode, stage the page.
//!
//! Guards: a depth limit (MNY_MAX_INDEX_DEPTH), a visited set against cycles,
//! and each page must belong to the table's tdef. Pages that would overflow
//! are refused with MissingCapability(PageSplit); nothing is staged then.

use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::{MnyError, Result};
use crate::page::{IndexEntry, IndexPage, IndexPageKind};
use crate::pager::Pager;
use crate::row::RowLocator;
use crate::schema::IndexDefinition;

/// What an insertion changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub leaf_page: u32,
    /// Position of the new entry on the leaf.
    pub position: usize,
    /// No other entry on the leaf had the same key bytes.
    pub new_key: bool,
}

fn load(pager: &mut Pager, page_no: u32, tdef_page: u32) -> Result<IndexPage> {
    let raw = pager.read_page(page_no)?;
    let page = IndexPage::decode(&raw, page_no)?;
    if page.tdef_page != tdef_page {
        return Err(MnyError::page(
            page_no,
            format!(
                "index page owned by tdef {}, expected {}",
                page.tdef_page, tdef_page
            ),
        ));
    }
    Ok(page)
}

/// Child to follow on a node page for `target`.
pub fn choose_child(node: &IndexPage, target: &IndexEntry) -> Result<u32> {
    for e in &node.entries {
        if e.cmp_sort(target) != Ordering::Less {
            return e
                .child
                .ok_or_else(|| MnyError::page(node.page_no, "node entry without child pointer"));
        }
    }
    if node.tail_page == 0 {
        return Err(MnyError::page(
            node.page_no,
            "key sorts after every entry but the node has no tail page",
        ));
    }
    Ok(node.tail_page)
}

/// Walk from the root to the leaf that should hold `target`.
pub fn find_leaf(
    pager: &mut Pager,
    index: &IndexDefinition,
    tdef_page: u32,
    target: &IndexEntry,
    max_depth: usize,
) -> Result<IndexPage> {
    let mut page_no = index.root_page;
    let mut seen = HashSet::new();
    let mut depth = 0usize;
    loop {
        if !seen.insert(page_no) {
            return Err(MnyError::page(page_no, "index page visited twice while descending"));
        }
        let page = load(pager, page_no, tdef_page)?;
        match page.kind {
            IndexPageKind::Leaf => {
                trace!("index '{}': leaf {} at depth {}", index.name, page_no, depth);
                return Ok(page);
            }
            IndexPageKind::Node => {
                depth += 1;
                if depth > max_depth {
                    return Err(MnyError::page(
                        page_no,
                        format!("index '{}' deeper than {} node levels", index.name, max_depth),
                    ));
                }
                page_no = choose_child(&page, target)?;
            }
        }
    }
}

/// Insert `key ‖ locator` into the index and stage the rewritten leaf.
pub fn insert_entry(
    pager: &mut Pager,
    index: &IndexDefinition,
    tdef_page: u32,
    key: &[u8],
    all_null: bool,
    locator: RowLocator,
    max_depth: usize,
) -> Result<InsertOutcome> {
    let entry = IndexEntry::leaf(key.to_vec(), locator);
    let mut leaf = find_leaf(pager, index, tdef_page, &entry, max_depth)?;

    let pos = match leaf.entries.binary_search_by(|e| e.cmp_sort(&entry)) {
        Ok(_) => {
            return Err(MnyError::DuplicateIndexEntry {
                index: index.name.clone(),
            })
        }
        Err(pos) => pos,
    };

    let same_before = pos > 0 && leaf.entries[pos - 1].key == entry.key;
    let same_after = pos < leaf.entries.len() && leaf.entries[pos].key == entry.key;
    if index.is_unique() && !all_null && (same_before || same_after) {
        return Err(MnyError::UniqueViolation {
            index: index.name.clone(),
        });
    }

    leaf.entries.insert(pos, entry);
    let bytes = leaf.encode()?;
    pager.stage_page(leaf.page_no, bytes)?;
    debug!(
        "index '{}': entry for {} at position {} on leaf {}",
        index.name, locator, pos, leaf.page_no
    );

    Ok(InsertOutcome {
        leaf_page: leaf.page_no,
        position: pos,
        new_key: !(same_before || same_after),
    })
}

/// Every leaf entry reachable from the root, in key order.
pub fn list_entries(
    pager: &mut Pager,
    index: &IndexDefinition,
    tdef_page: u32,
    max_depth: usize,
) -> Result<Vec<IndexEntry>> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    collect(pager, index.root_page, tdef_page, 0, max_depth, &mut seen, &mut out)?;
    Ok(out)
}

fn collect(
    pager: &mut Pager,
    page_no: u32,
    tdef_page: u32,
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<u32>,
    out: &mut Vec<IndexEntry>,
) -> Result<()> {
    if !seen.insert(page_no) {
        return Err(MnyError::page(page_no, "index page reachable twice"));
    }
    let page = load(pager, page_no, tdef_page)?;
    match page.kind {
        IndexPageKind::Leaf => {
            out.extend(page.entries);
            Ok(())
        }
        IndexPageKind::Node => {
            if depth + 1 > max_depth {
                return Err(MnyError::page(
                    page_no,
                    format!("index deeper than {} node levels", max_depth),
                ));
            }
            for e in &page.entries {
                if let Some(child) = e.child {
                    collect(pager, child, tdef_page, depth + 1, max_depth, seen, out)?;
                }
            }
            if page.tail_page != 0 {
                collect(pager, page.tail_page, tdef_page, depth + 1, max_depth, seen, out)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(page: u32, row: u8) -> RowLocator {
        RowLocator { page, row }
    }

    #[test]
    fn node_child_choice() {
        let mut node = IndexPage::new_node(50, 16, 99);
        node.entries = vec![
            IndexEntry::node(vec![0x7F, 0x80, 0x10], loc(20, 3), 51),
            IndexEntry::node(vec![0x7F, 0x80, 0x20], loc(20, 9), 52),
        ];
        let probe = |k: Vec<u8>, l| choose_child(&node, &IndexEntry::leaf(k, l)).unwrap();

        assert_eq!(probe(vec![0x7F, 0x80, 0x05], loc(30, 0)), 51);
        // same key, larger locator → next child
        assert_eq!(probe(vec![0x7F, 0x80, 0x10], loc(20, 4)), 52);
        // shorter key is a prefix → sorts first
        assert_eq!(probe(vec![0x7F, 0x80], loc(99, 0)), 51);
        assert_eq!(probe(vec![0x7F, 0x81], loc(0, 0)), 99);
    }

    #[test]
    fn missing_tail_is_a_page_error() {
        let node = IndexPage::new_node(50, 16, 0);
        let err = choose_child(&node, &IndexEntry::leaf(vec![1], loc(1, 1))).unwrap_err();
        assert!(matches!(err, MnyError::PageBounds { page: 50, .. }));
    }
}
