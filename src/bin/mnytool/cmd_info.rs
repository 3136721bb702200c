use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use mnykit::consts::PAGE_SIZE;
use mnykit::header::{validate_file_len, FileHeader};

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let mut f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let len = f.metadata()?.len();
    let pages = validate_file_len(len)?;
    let mut page0 = vec![0u8; PAGE_SIZE];
    f.read_exact(&mut page0)
        .map_err(|e| anyhow!("read header of {}: {}", path.display(), e))?;
    let h = FileHeader::parse(&page0)?;

    if json {
        let obj = serde_json::json!({
            "path": path.display().to_string(),
            "format": format!("{:?}", h.format),
            "version": h.version,
            "digest": format!("{:?}", h.digest_kind()),
            "crypt_flags": h.crypt_flags,
            "pages": pages,
            "size_bytes": len,
        });
        println!("{}", serde_json::to_string_pretty(&obj)?);
        return Ok(());
    }

    println!("File:        {}", path.display());
    println!("Format:      {:?} (version {})", h.format, h.version);
    println!("Cipher:      RC4, {:?} password digest", h.digest_kind());
    println!("Crypt flags: 0x{:08x}", h.crypt_flags);
    println!("Pages:       {} x {} B", pages, PAGE_SIZE);
    Ok(())
}
