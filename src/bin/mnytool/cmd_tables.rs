use anyhow::Result;
use std::path::PathBuf;

use crate::util::open_file;

pub fn exec(path: PathBuf, password: Option<String>, json: bool) -> Result<()> {
    let db = open_file(&path, password)?;
    let entries: Vec<_> = db.catalog().user_tables().cloned().collect();
    if json {
        let arr: Vec<_> = entries
            .iter()
            .map(|e| serde_json::json!({ "name": e.name, "tdef_page": e.tdef_page }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&arr)?);
        return Ok(());
    }
    for e in entries {
        println!("{:<24} tdef={}", e.name, e.tdef_page);
    }
    Ok(())
}
