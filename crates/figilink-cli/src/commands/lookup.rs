use std::time::Duration;

use figilink_core::{IsinLookup, LookupOptions, OpenFigiConfig, RetryPolicy};

use super::warehouse_config;
use crate::cli::{Cli, LookupArgs};
use crate::error::CliError;
use crate::output;

pub async fn run(cli: &Cli, args: &LookupArgs) -> Result<(), CliError> {
    let lookup = IsinLookup::open(
        openfigi_config(cli)?,
        retry_policy(cli)?,
        warehouse_config(cli),
    )?;

    let options = LookupOptions {
        max_attempts: args.max_retries,
        start_attempt: args.start_attempt,
    };
    let result = lookup.lookup_with(&args.isin, options).await;
    tracing::info!(
        isin = %result.isin,
        status = ?result.status,
        attempts = result.attempts_used,
        "lookup finished"
    );

    output::render(&result, cli.pretty)
}

fn openfigi_config(cli: &Cli) -> Result<OpenFigiConfig, CliError> {
    let mut config = OpenFigiConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url.as_str())?;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(timeout_ms));
    }
    if config.api_key().is_none() {
        tracing::warn!("OPENFIGI_API_KEY is not set; lookups will fail without calling the API");
    }
    Ok(config)
}

fn retry_policy(cli: &Cli) -> Result<RetryPolicy, CliError> {
    let policy = RetryPolicy::from_env()?;
    Ok(match cli.retry_delay_ms {
        Some(delay_ms) => {
            RetryPolicy::linear(policy.max_attempts(), Duration::from_millis(delay_ms))
        }
        None => policy,
    })
}
