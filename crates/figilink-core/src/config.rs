use std::env;
use std::time::Duration;

use crate::ValidationError;

/// Read a millisecond duration from the environment.
///
/// Unset or blank variables fall back to `default`; anything that is not a
/// non-negative integer is rejected rather than silently ignored.
pub(crate) fn duration_ms_from_env(
    name: &'static str,
    default: Duration,
) -> Result<Duration, ValidationError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ValidationError::InvalidEnvNumber { name, value: raw }),
        _ => Ok(default),
    }
}

/// Read a non-blank string from the environment.
pub(crate) fn string_from_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
