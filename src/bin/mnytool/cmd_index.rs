use anyhow::Result;
use std::path::PathBuf;

use crate::util::{hex, open_file};

pub fn exec(path: PathBuf, password: Option<String>, table: String, name: Option<String>) -> Result<()> {
    let mut db = open_file(&path, password)?;
    let def = db.table_definition(&table)?;
    let names: Vec<String> = match name {
        Some(n) => vec![n],
        None => def.indexes.iter().map(|i| i.name.clone()).collect(),
    };
    if names.is_empty() {
        println!("table {} has no indexes", def.name);
        return Ok(());
    }
    for n in names {
        let entries = db.index_entries(&def.name, &n)?;
        println!("index {} ({} entries)", n, entries.len());
        for e in entries {
            println!("  {} -> {}", hex(&e.key), e.locator);
        }
    }
    Ok(())
}
