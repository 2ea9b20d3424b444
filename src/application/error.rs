use thiserror::Error;

use crate::{domain::DomainError, infra::error::InfraError};

use super::aggregator::AggregatorError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the command-line binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => 2,
            AppError::Infra(InfraError::Configuration { .. }) | AppError::Aggregator(_) => 3,
            AppError::Infra(InfraError::Io(_)) | AppError::Infra(InfraError::Telemetry(_)) => 1,
            AppError::Unexpected(_) => 1,
        }
    }
}
