use anyhow::Result;
use std::path::PathBuf;

use crate::util::open_file;

pub fn exec(path: PathBuf, password: Option<String>, table: String, json: bool) -> Result<()> {
    let mut db = open_file(&path, password)?;
    let def = db.table_definition(&table)?;

    if json {
        let cols: Vec<_> = def
            .columns
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "type": c.col_type.to_string(),
                    "col_num": c.col_num,
                    "fixed": c.is_fixed(),
                    "offset": c.fixed_offset,
                    "var_slot": c.var_slot,
                    "size": c.size,
                    "nullable": c.is_nullable(),
                })
            })
            .collect();
        let idx: Vec<_> = def
            .indexes
            .iter()
            .map(|i| {
                let cols: Vec<_> = i
                    .columns
                    .iter()
                    .map(|ic| {
                        serde_json::json!({
                            "column": def.columns[ic.column].name,
                            "ascending": ic.ascending,
                        })
                    })
                    .collect();
                serde_json::json!({
                    "name": i.name,
                    "root_page": i.root_page,
                    "columns": cols,
                    "unique": i.is_unique(),
                    "ignore_nulls": i.ignores_nulls(),
                    "primary_key": i.primary_key,
                    "entries": i.entry_count,
                })
            })
            .collect();
        let obj = serde_json::json!({
            "table": def.name,
            "tdef_page": def.tdef_page,
            "rows": def.row_count,
            "columns": cols,
            "indexes": idx,
        });
        println!("{}", serde_json::to_string_pretty(&obj)?);
        return Ok(());
    }

    println!("Table {} (tdef page {}, {} rows)", def.name, def.tdef_page, def.row_count);
    println!("Columns:");
    for c in &def.columns {
        let place = if c.is_fixed() {
            format!("fixed @{}", c.fixed_offset)
        } else {
            format!("var slot {}", c.var_slot)
        };
        println!(
            "  #{:<3} {:<24} {:<10} {:<14} size={}{}",
            c.col_num,
            c.name,
            c.col_type.to_string(),
            place,
            c.size,
            if c.is_nullable() { "" } else { " not-null" }
        );
    }
    if def.indexes.is_empty() {
        println!("Indexes: none");
        return Ok(());
    }
    println!("Indexes:");
    for i in &def.indexes {
        let cols: Vec<String> = i
            .columns
            .iter()
            .map(|ic| {
                format!(
                    "{}{}",
                    def.columns[ic.column].name,
                    if ic.ascending { "" } else { " desc" }
                )
            })
            .collect();
        println!(
            "  {:<24} root={} entries={} [{}]{}{}",
            i.name,
            i.root_page,
            i.entry_count,
            cols.join(", "),
            if i.primary_key { " pk" } else if i.is_unique() { " unique" } else { "" },
            if i.ignores_nulls() { " ignore-nulls" } else { "" }
        );
    }
    Ok(())
}
