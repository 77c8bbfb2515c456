//! Application error types

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code for callers that report errors outside Rust
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DuckDb(_) => "DUCKDB_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_value() {
        let err = AppError::Validation("Invalid sort option: bogus".to_string());
        assert_eq!(err.to_string(), "Validation error: Invalid sort option: bogus");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
