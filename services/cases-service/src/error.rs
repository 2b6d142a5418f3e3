//! Service error type and its mapping onto gRPC statuses.

use crate::etag::EtagError;
use crate::store::StoreError;
use thiserror::Error;
use tonic::Status;
use tracing::{debug, info, warn};

/// Result alias used by the handlers.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors produced while serving a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The request is malformed or violates a field constraint.
    #[error("{0}")]
    InvalidArgument(String),
    /// A store lookup or optimistic-concurrency check failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An etag could not be decoded.
    #[error(transparent)]
    Etag(#[from] EtagError),
    /// A uniqueness constraint would be violated.
    #[error("{0}")]
    AlreadyExists(String),
    /// The operation is not allowed in the record's current state.
    #[error("{0}")]
    FailedPrecondition(String),
    /// The caller lacks the required access.
    #[error("{0}")]
    PermissionDenied(String),
    /// The caller could not be identified.
    #[error("{0}")]
    Unauthenticated(String),
    /// An invariant of the service itself is broken.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Shorthand for [`ServiceError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::InvalidArgument(_)
            | ServiceError::Etag(_)
            | ServiceError::Store(StoreError::InvalidSearch(_)) => {
                debug!(error = %message, "invalid argument");
                Self::invalid_argument(message)
            }
            ServiceError::Store(StoreError::NotFound { .. }) => {
                info!(error = %message, "not found");
                Self::not_found(message)
            }
            ServiceError::Store(StoreError::VersionMismatch { .. }) => {
                info!(error = %message, "version conflict");
                Self::aborted(message)
            }
            ServiceError::AlreadyExists(_) => {
                info!(error = %message, "already exists");
                Self::already_exists(message)
            }
            ServiceError::FailedPrecondition(_) => {
                info!(error = %message, "failed precondition");
                Self::failed_precondition(message)
            }
            ServiceError::PermissionDenied(_) => {
                warn!(error = %message, "permission denied");
                Self::permission_denied(message)
            }
            ServiceError::Unauthenticated(_) => {
                warn!(error = %message, "unauthenticated");
                Self::unauthenticated(message)
            }
            ServiceError::Internal(_) => {
                tracing::error!(error = %message, "internal error");
                Self::internal("Internal server error")
            }
        }
    }
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        ServiceError::from(err).into()
    }
}
