use figilink_core::CoreError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] figilink_core::ValidationError),

    #[error(transparent)]
    Warehouse(#[from] figilink_core::WarehouseError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Warehouse(_) => 3,
            Self::Core(CoreError::Validation(_)) => 2,
            Self::Core(CoreError::Warehouse(_)) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
