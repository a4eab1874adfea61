use thiserror::Error;

use crate::store::{QueryError, StoreError};

/// Primary-path failures, one variant per HTTP outcome.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    MalformedQuery(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            other => ServiceError::Store(other),
        }
    }
}

impl From<QueryError> for ServiceError {
    fn from(err: QueryError) -> Self {
        ServiceError::MalformedQuery(err.to_string())
    }
}
