use anyhow::Result;
use std::path::PathBuf;

use mnykit::{check_file_password, MnyConfig};

use crate::util::resolve_password;

/// Exit code 0 when the password is right, 2 when it is wrong.
pub fn exec(path: PathBuf, password: Option<String>) -> Result<()> {
    let pw = resolve_password(password);
    if check_file_password(&path, &pw, MnyConfig::from_env())? {
        println!("password OK");
        Ok(())
    } else {
        println!("bad password");
        std::process::exit(2);
    }
}
