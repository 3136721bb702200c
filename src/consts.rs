//! Format constants shared by the cipher, catalog, row and index layers.
//!
//! Offsets are byte offsets inside a 4096-byte page. Multi-byte integers are
//! little-endian unless a comment says otherwise (index entries use big-endian
//! locators so that they sort bytewise).

// -------- Pages --------
pub const PAGE_SIZE: usize = 4096;

/// Pages 1..=14 are RC4-enciphered at rest; page 0 and 15+ are plaintext.
pub const FIRST_ENCRYPTED_PAGE: u32 = 1;
pub const LAST_ENCRYPTED_PAGE: u32 = 14;

// Page-type tags (byte 0 of every page).
pub const PAGE_TYPE_HEADER: u8 = 0x00;
pub const PAGE_TYPE_DATA: u8 = 0x01;
pub const PAGE_TYPE_TDEF: u8 = 0x02;
pub const PAGE_TYPE_INDEX_NODE: u8 = 0x03;
pub const PAGE_TYPE_INDEX_LEAF: u8 = 0x04;
pub const PAGE_TYPE_USAGE_MAP: u8 = 0x05;

// -------- File header (page 0) --------
pub const HDR_OFF_FORMAT_ID: usize = 0x04;
pub const HDR_FORMAT_ID_LEN: usize = 16;
pub const HDR_FORMAT_MSISAM: &[u8; 16] = b"MSISAM Database\0";
pub const HDR_FORMAT_JET: &[u8; 16] = b"Standard Jet DB\0";
pub const HDR_OFF_VERSION: usize = 0x14;

pub const HDR_OFF_SALT: usize = 0x72;
pub const SALT_LEN: usize = 8;
pub const BASE_SALT_LEN: usize = 4;
/// XOR mask applied to the first four stored salt bytes (from known-good files).
pub const BASE_SALT_MASK: [u8; 4] = [0x12, 0x4F, 0x4A, 0x94];

pub const HDR_OFF_CRYPT_FLAGS: usize = 0x298;
pub const FLAG_NEW_ENCRYPTION: u32 = 0x06;
pub const FLAG_USE_SHA1: u32 = 0x20;

/// Test bytes live at CRYPT_CHECK_START + raw_salt[0].
pub const HDR_CRYPT_CHECK_START: usize = 0x2E9;
pub const CRYPT_CHECK_LEN: usize = 4;

pub const PASSWORD_BUF_LEN: usize = 40;
pub const PASSWORD_DIGEST_LEN: usize = 16;
pub const ENCODING_KEY_LEN: usize = PASSWORD_DIGEST_LEN + BASE_SALT_LEN;

// -------- Data pages --------
pub const DATA_OFF_FREE_SPACE: usize = 0x02;
pub const DATA_OFF_TDEF_PAGE: usize = 0x04;
pub const DATA_OFF_ROW_COUNT: usize = 0x0C;
pub const DATA_OFF_ROW_TABLE: usize = 0x0E;

pub const ROW_OFFSET_MASK: u16 = 0x1FFF;
pub const ROW_FLAG_DELETED: u16 = 0x4000;
pub const ROW_FLAG_LOOKUP: u16 = 0x8000;

// -------- Table definition pages --------
pub const TDEF_OFF_NEXT_PAGE: usize = 0x04;
pub const TDEF_OFF_LEN: usize = 0x08;
pub const TDEF_CONTINUATION_START: usize = 8;

pub const TDEF_OFF_ROW_COUNT: usize = 16;
pub const TDEF_OFF_TABLE_TYPE: usize = 40;
pub const TDEF_OFF_MAX_COLS: usize = 41;
pub const TDEF_OFF_VAR_COLS: usize = 43;
pub const TDEF_OFF_NUM_COLS: usize = 45;
pub const TDEF_OFF_NUM_IDX: usize = 47;
pub const TDEF_OFF_NUM_REAL_IDX: usize = 51;
pub const TDEF_OFF_USAGE_MAP: usize = 55;
pub const TDEF_HEADER_LEN: usize = 63;

pub const TDEF_REAL_IDX_BLOCK_LEN: usize = 12;
pub const TDEF_COLUMN_LEN: usize = 25;
pub const TDEF_REAL_IDX_DEF_LEN: usize = 52;
pub const TDEF_LOGICAL_IDX_LEN: usize = 28;
pub const TDEF_IDX_MAX_COLUMNS: usize = 10;

/// Constant found at the head of every column record.
pub const MAGIC_TABLE_NUMBER: u32 = 1625;
/// Constant found at the head of every index block/record.
pub const MAGIC_INDEX_NUMBER: u32 = 1923;
/// How far past the column names the index-definition scan may look.
pub const INDEX_SCAN_WINDOW: usize = 64;

pub const TABLE_TYPE_USER: u8 = 0x4E;
pub const TABLE_TYPE_SYSTEM: u8 = 0x53;

pub const COL_FLAG_FIXED: u8 = 0x01;
pub const COL_FLAG_NULLABLE: u8 = 0x02;
pub const COL_FLAG_AUTONUMBER: u8 = 0x04;

pub const IDX_FLAG_UNIQUE: u8 = 0x01;
pub const IDX_FLAG_IGNORE_NULLS: u8 = 0x02;
pub const IDX_FLAG_REQUIRED: u8 = 0x08;
pub const IDX_ORDER_ASCENDING: u8 = 0x01;
pub const IDX_UNUSED_COLUMN: u16 = 0xFFFF;
pub const IDX_TYPE_PRIMARY_KEY: u8 = 0x01;

// -------- System catalog --------
pub const CATALOG_TDEF_PAGE: u32 = 2;
pub const CATALOG_OBJECT_TYPE_TABLE: i64 = 1;
pub const CATALOG_ID_PAGE_MASK: i64 = 0x00FF_FFFF;

// -------- Index pages --------
pub const IDX_OFF_FREE_SPACE: usize = 0x02;
pub const IDX_OFF_TDEF_PAGE: usize = 0x04;
pub const IDX_OFF_PREV_PAGE: usize = 0x08;
pub const IDX_OFF_NEXT_PAGE: usize = 0x0C;
pub const IDX_OFF_TAIL_PAGE: usize = 0x10;
pub const IDX_OFF_PREFIX_LEN: usize = 0x14;
pub const IDX_OFF_ENTRY_COUNT: usize = 0x16;
pub const IDX_OFF_ENTRY_START: usize = 0x18;
pub const IDX_OFF_ENTRY_MASK: usize = 0x1B;
pub const IDX_ENTRY_MASK_LEN: usize = 249;
pub const IDX_ENTRY_AREA_START: usize = IDX_OFF_ENTRY_MASK + IDX_ENTRY_MASK_LEN;
/// Largest cumulative entry length a mask bit can mark.
pub const IDX_MAX_ENTRY_BYTES: usize = IDX_ENTRY_MASK_LEN * 8 - 1;

/// Row locator on disk: 3-byte big-endian page + 1-byte row slot.
pub const ROW_LOCATOR_LEN: usize = 4;
/// Child pointer on node entries: 4-byte big-endian page.
pub const CHILD_POINTER_LEN: usize = 4;

// -------- Index key markers --------
pub const KEY_NULL_ASC: u8 = 0x00;
pub const KEY_NULL_DESC: u8 = 0xFF;
pub const KEY_START_ASC: u8 = 0x7F;
pub const KEY_START_DESC: u8 = 0x80;
pub const KEY_BOOL_TRUE_ASC: u8 = 0x00;
pub const KEY_BOOL_FALSE_ASC: u8 = 0xFF;

// -------- Values --------
pub const CURRENCY_SCALE: i64 = 10_000;
