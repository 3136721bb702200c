//! index — B-tree secondary indexes.
//!
//! - key.rs   — `encode_key`: row values → order-preserving key bytes.
//! - btree.rs — descent from the root, leaf insertion, in-order listing.
//!
//! Page layout lives in `page::index`.

pub mod btree;
pub mod key;

pub use btree::{choose_child, find_leaf, insert_entry, list_entries, InsertOutcome};
pub use key::{encode_key, EncodedKey};
