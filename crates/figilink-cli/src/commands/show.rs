use serde::Serialize;

use figilink_core::{ApiLogRow, Isin, StoredSecurity, Warehouse};

use super::warehouse_config;
use crate::cli::{Cli, ShowArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ShowResponse {
    isin: Isin,
    security: Option<StoredSecurity>,
    api_log: Vec<ApiLogRow>,
}

pub fn run(cli: &Cli, args: &ShowArgs) -> Result<(), CliError> {
    let isin = Isin::parse(&args.isin)?;
    let warehouse = Warehouse::open(warehouse_config(cli))?;
    let security = warehouse.get_security(isin.as_str())?;
    let api_log = warehouse.recent_api_log(isin.as_str(), args.history)?;

    output::render(
        &ShowResponse {
            isin,
            security,
            api_log,
        },
        cli.pretty,
    )
}
