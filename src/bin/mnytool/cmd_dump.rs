use anyhow::Result;
use std::path::PathBuf;

use crate::util::open_file;

pub fn exec(path: PathBuf, password: Option<String>, table: String, json: bool) -> Result<()> {
    let mut db = open_file(&path, password)?;
    let scan = db.read_table(&table)?;

    for row in &scan.rows {
        if json {
            println!("{}", serde_json::to_string(row)?);
        } else {
            let loc = row
                .locator
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string());
            let cells: Vec<String> = row
                .values
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            println!("[{}] {}", loc, cells.join(" "));
        }
    }
    if scan.skipped > 0 {
        eprintln!("warning: {} undecodable row(s) skipped", scan.skipped);
    }
    if !json {
        println!("{} row(s)", scan.rows.len());
    }
    Ok(())
}
