use anyhow::Result;
use std::path::PathBuf;

use mnykit::PendingRow;

use crate::util::{open_file, read_values};

pub fn exec(
    path: PathBuf,
    password: Option<String>,
    table: String,
    values_json: Option<String>,
    values_file: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let values = read_values(values_json, values_file)?;
    let pending = PendingRow {
        table,
        values: values.into_iter().collect(),
    };

    let mut db = open_file(&path, password)?;
    let report = db.insert_pending(&pending)?;
    println!("row staged at {}", report.locator);
    for n in &report.indexes_updated {
        println!("  index {}: entry added", n);
    }
    for n in &report.indexes_skipped {
        println!("  index {}: skipped", n);
    }

    if dry_run {
        db.discard();
        println!("dry run: {} left untouched", path.display());
        return Ok(());
    }
    let pages = db.commit()?;
    println!("committed {} page(s)", pages);
    Ok(())
}
