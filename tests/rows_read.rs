mod common;

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};

use common::{
    definition, money_file, tdef_page, trn_row, trn_spec, unique_path, ColSpec, MnyBuilder,
    TableSpec, PASSWORD, TRN_DATA, TRN_TDEF,
};
use mnykit::consts::{
    DATA_OFF_ROW_COUNT, DATA_OFF_ROW_TABLE, ROW_FLAG_DELETED, ROW_FLAG_LOOKUP, ROW_OFFSET_MASK,
    TABLE_TYPE_USER,
};
use mnykit::page::{data_append_row, data_page_init};
use mnykit::row::{decode_row, encode_row};
use mnykit::{
    parse_table_definition, ColumnType, Currency, MnyConfig, MnyError, MnyFile, OleDate, Row,
    RowLocator, Value,
};

/// id: Long @0, amount: Money @4, без индексов.
#[test]
fn two_column_row_decodes_to_id_and_amount() -> Result<()> {
    let spec = TableSpec {
        table_type: TABLE_TYPE_USER,
        row_count: 1,
        columns: vec![
            ColSpec::fixed("id", ColumnType::Long, 0, 0, 4),
            ColSpec::fixed("amount", ColumnType::Money, 1, 4, 8),
        ],
        indexes: vec![],
        index_gap: 0,
    };
    let def = parse_table_definition(30, &tdef_page(&spec))?;
    assert_eq!(def.columns.len(), 2);
    assert!(def.indexes.is_empty());

    let raw = [
        0x02, 0x00, // column count
        0x01, 0x00, 0x00, 0x00, // id
        0x10, 0x27, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // amount, raw 10000
        0x03, // both present
    ];
    let row = decode_row(&raw, &def, 31, 0)?;
    assert_eq!(row.get("id"), Some(&Value::Integer(1)));
    assert_eq!(row.get("amount").map(|v| v.to_string()), Some("1.0000".to_string()));

    // запись даёт тот же кадр
    let back = encode_row(
        &Row::new()
            .with("id", Value::Integer(1))
            .with("amount", Value::Currency(Currency(10_000))),
        &def,
    )?;
    assert_eq!(back, raw);
    Ok(())
}

#[test]
fn reads_typed_values_end_to_end() -> Result<()> {
    let path = money_file("read")?;
    let mut db = MnyFile::open_with_config(&path, PASSWORD, MnyConfig::default())?;

    let scan = db.read_table("TRN")?;
    assert_eq!(scan.skipped, 0);
    assert_eq!(scan.rows.len(), 1);
    let row = &scan.rows[0];
    assert_eq!(row.get("htrn"), Some(&Value::Integer(1)));
    assert_eq!(row.get("amt"), Some(&Value::Currency(Currency(10_000))));
    assert_eq!(row.get("amt").map(|v| v.to_string()), Some("1.0000".to_string()));
    assert_eq!(row.get("dt"), Some(&Value::Date(OleDate(45_000.0))));
    assert_eq!(row.get("cleared"), Some(&Value::Null));
    assert_eq!(row.get("memo"), Some(&Value::Null));
    assert_eq!(row.locator, Some(RowLocator { page: TRN_DATA, row: 0 }));

    // ACCT лежит в зашифрованных страницах; bool размера 0 живёт в маске
    let accts = db.read_table("acct")?;
    assert_eq!(accts.rows.len(), 2);
    assert_eq!(accts.rows[0].get("open"), Some(&Value::Bool(true)));
    assert_eq!(accts.rows[1].get("open"), Some(&Value::Bool(false)));
    assert_eq!(accts.rows[1].get("balance"), Some(&Value::Currency(Currency(20_000))));

    let json = serde_json::to_value(row)?;
    assert_eq!(json["htrn"], serde_json::json!(1));
    Ok(())
}

fn with_extra_trn_rows(extra: &[&[u8]]) -> Result<std::path::PathBuf> {
    let mut b = MnyBuilder::money();
    let page = &mut b.pages[TRN_DATA as usize];
    for raw in extra {
        data_append_row(page, TRN_DATA, raw)?.expect("room on the data page");
    }
    let path = unique_path("corrupt");
    b.write(&path, PASSWORD)?;
    Ok(path)
}

#[test]
fn undecodable_rows_are_skipped_or_fatal_in_strict_mode() -> Result<()> {
    // пять колонок, но нет места под таблицу переменных колонок
    let path = with_extra_trn_rows(&[&[5, 0, 0x01]])?;

    let mut db = MnyFile::open_with_config(&path, PASSWORD, MnyConfig::default())?;
    let scan = db.read_table("TRN")?;
    assert_eq!(scan.rows.len(), 1);
    assert_eq!(scan.skipped, 1);

    let strict = MnyConfig::default().with_strict_rows(true);
    let mut db = MnyFile::open_with_config(&path, PASSWORD, strict)?;
    let err = db.read_table("TRN").unwrap_err();
    match err {
        MnyError::RowDecode { page, row, .. } => {
            assert_eq!(page, TRN_DATA);
            assert_eq!(row, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn lookup_slot_is_followed_once() -> Result<()> {
    let def = definition(&trn_spec(), TRN_TDEF, "TRN");
    let mut b = MnyBuilder::money();

    // строка на странице 23, которая не принадлежит TRN
    let mut overflow = vec![0u8; mnykit::consts::PAGE_SIZE];
    data_page_init(&mut overflow, 0);
    let raw = encode_row(&trn_row(7, -25_000, 45_100.5), &def)?;
    data_append_row(&mut overflow, 23, &raw)?.expect("room");
    b.pages[23] = overflow;

    // слот 1 на странице TRN: указатель [row][page u24]
    let page = &mut b.pages[TRN_DATA as usize];
    data_append_row(page, TRN_DATA, &[0, 23, 0, 0])?.expect("room");
    let slot = DATA_OFF_ROW_TABLE + 2;
    let off = LittleEndian::read_u16(&page[slot..slot + 2]) | ROW_FLAG_LOOKUP;
    LittleEndian::write_u16(&mut page[slot..slot + 2], off);

    let path = unique_path("lookup");
    b.write(&path, PASSWORD)?;
    let mut db = MnyFile::open_with_config(&path, PASSWORD, MnyConfig::default())?;
    let scan = db.read_table("TRN")?;
    assert_eq!(scan.rows.len(), 2);
    let moved = &scan.rows[1];
    assert_eq!(moved.get("htrn"), Some(&Value::Integer(7)));
    assert_eq!(moved.get("amt").map(|v| v.to_string()), Some("-2.5000".to_string()));
    assert_eq!(moved.locator, Some(RowLocator { page: TRN_DATA, row: 1 }));
    Ok(())
}

#[test]
fn slot_past_one_byte_locator_is_a_row_error() -> Result<()> {
    let mut b = MnyBuilder::money();
    let page = &mut b.pages[TRN_DATA as usize];
    let slot = |i: usize| DATA_OFF_ROW_TABLE + 2 * i;
    let start0 = (LittleEndian::read_u16(&page[slot(0)..]) & ROW_OFFSET_MASK) as usize;
    let row0 = page[start0..].to_vec();

    // слоты 1..=256 удалены, слот 257 — живая копия строки 0
    for i in 1..=256 {
        LittleEndian::write_u16(&mut page[slot(i)..], start0 as u16 | ROW_FLAG_DELETED);
    }
    let start = start0 - row0.len();
    page[start..start0].copy_from_slice(&row0);
    LittleEndian::write_u16(&mut page[slot(257)..], start as u16);
    LittleEndian::write_u16(&mut page[DATA_OFF_ROW_COUNT..], 258);
    let path = unique_path("slots");
    b.write(&path, PASSWORD)?;

    let mut db = MnyFile::open_with_config(&path, PASSWORD, MnyConfig::default())?;
    let scan = db.read_table("TRN")?;
    assert_eq!(scan.rows.len(), 1);
    assert_eq!(scan.skipped, 1);

    let strict = MnyConfig::default().with_strict_rows(true);
    let mut db = MnyFile::open_with_config(&path, PASSWORD, strict)?;
    let err = db.read_table("TRN").unwrap_err();
    assert!(
        matches!(err, MnyError::RowDecode { page, row: 257, .. } if page == TRN_DATA),
        "{err}"
    );
    Ok(())
}
