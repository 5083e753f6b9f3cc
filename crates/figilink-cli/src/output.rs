use std::io::{self, Write};

use figilink_core::LookupResult;
use serde::Serialize;

use crate::error::CliError;

fn to_document<T: Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(payload)
}

/// Write one JSON document to stdout.
pub fn render<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let payload = to_document(value, pretty)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{payload}")?;
    Ok(())
}

/// Result-shaped stand-in when the command itself failed.
pub fn error_document(isin: &str, error: &CliError) -> LookupResult {
    LookupResult::execution_error(isin, error.to_string())
}

pub fn render_error(isin: &str, error: &CliError, pretty: bool) {
    if let Err(write_error) = render(&error_document(isin, error), pretty) {
        tracing::error!(error = %write_error, "failed to write error document");
    }
}
