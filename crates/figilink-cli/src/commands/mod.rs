mod lookup;
mod show;

use figilink_core::WarehouseConfig;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Lookup(args) => lookup::run(cli, args).await,
        Command::Show(args) => show::run(cli, args),
    }
}

fn warehouse_config(cli: &Cli) -> WarehouseConfig {
    match &cli.db_path {
        Some(path) => WarehouseConfig::with_db_path(path),
        None => WarehouseConfig::default(),
    }
}
