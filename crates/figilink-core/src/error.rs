use thiserror::Error;

use figilink_warehouse::WarehouseError;

/// Validation and configuration errors exposed by `figilink-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "invalid ISIN '{value}': expected 2 uppercase letters, \
         9 uppercase alphanumerics and a check digit"
    )]
    InvalidIsin { value: String },

    #[error("OpenFIGI API URL cannot be empty")]
    EmptyApiUrl,

    #[error("environment variable {name} must be a non-negative integer: '{value}'")]
    InvalidEnvNumber { name: &'static str, value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),
}
