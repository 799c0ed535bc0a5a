use thiserror::Error;

use crate::messaging::DeliveryFailure;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Delivery error: {0}")]
    Delivery(DeliveryFailure),

    #[error("Rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Storage failures leave the conversation in an unknown state, so it is dropped.
    pub fn clears_session(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::RateLimited { .. })
    }

    pub fn log(&self) {
        match self {
            AppError::Storage(_) | AppError::Delivery(_) => tracing::error!("{}", self),
            AppError::RateLimited { .. } => tracing::warn!("{}", self),
            _ => tracing::debug!("{}", self),
        }
    }
}

impl From<DeliveryFailure> for AppError {
    fn from(failure: DeliveryFailure) -> Self {
        match failure {
            DeliveryFailure::RateLimited { retry_after_secs } => AppError::RateLimited { retry_after_secs },
            other => AppError::Delivery(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient_and_keeps_session() {
        let err = AppError::from(DeliveryFailure::RateLimited { retry_after_secs: Some(3) });
        assert!(err.is_transient());
        assert!(!err.clears_session());
    }

    #[test]
    fn storage_errors_clear_the_session() {
        assert!(AppError::Storage("connection refused".into()).clears_session());
        assert!(!AppError::Validation("bad date".into()).clears_session());
    }
}
