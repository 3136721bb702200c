use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};

mod cli;
mod util;
mod cmd_dump;
mod cmd_index;
mod cmd_info;
mod cmd_insert;
mod cmd_schema;
mod cmd_tables;
mod cmd_verify;

fn init_logger() {
    // RUST_LOG, иначе info. Пример: RUST_LOG=mnykit=debug mnytool dump ...
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Info { path, json } =>
            cmd_info::exec(path, json),

        cli::Cmd::Verify { path, password } =>
            cmd_verify::exec(path, password),

        cli::Cmd::Tables { path, password, json } =>
            cmd_tables::exec(path, password, json),

        cli::Cmd::Schema { path, password, table, json } =>
            cmd_schema::exec(path, password, table, json),

        cli::Cmd::Dump { path, password, table, json } =>
            cmd_dump::exec(path, password, table, json),

        cli::Cmd::Index { path, password, table, name } =>
            cmd_index::exec(path, password, table, name),

        cli::Cmd::Insert { path, password, table, values_json, values_file, dry_run } =>
            cmd_insert::exec(path, password, table, values_json, values_file, dry_run),
    }
}
