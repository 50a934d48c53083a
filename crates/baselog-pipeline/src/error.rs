use std::fmt;
use std::time::Duration;

use baselog_registry::RegistryError;
use baselog_store::StoreError;
use serde::{Deserialize, Serialize};

/// Errors surfaced by a commit.
///
/// Store and registry failures are carried verbatim. The type is `Clone`
/// so the last error can be held in the observable pipeline state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The note was rejected before any network call.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The registry write was not included within the configured bound.
    #[error("confirmation timed out after {0:?}")]
    ConfirmationTimeout(Duration),

    /// Another commit is already in flight.
    #[error("a commit is already in progress")]
    PipelineBusy,

    /// The commit future was dropped before reaching a terminal state.
    /// Side effects already dispatched still happen.
    #[error("commit abandoned by the caller")]
    Abandoned,
}

/// Flat classification of every failure a commit can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationFailed,
    NotConfigured,
    AuthFailed,
    RateLimited,
    UploadFailed,
    NetworkError,
    AllGatewaysFailed,
    InvalidContentId,
    SigningRejected,
    NotConnected,
    SubmitFailed,
    ConfirmationTimeout,
    ConfirmationReverted,
    PipelineBusy,
    ReadFailed,
    Abandoned,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::ConfirmationTimeout(_) => ErrorKind::ConfirmationTimeout,
            Self::PipelineBusy => ErrorKind::PipelineBusy,
            Self::Abandoned => ErrorKind::Abandoned,
            Self::Store(e) => match e {
                StoreError::NotConfigured(_) => ErrorKind::NotConfigured,
                StoreError::AuthFailed { .. } => ErrorKind::AuthFailed,
                StoreError::RateLimited => ErrorKind::RateLimited,
                StoreError::UploadFailed(_) => ErrorKind::UploadFailed,
                StoreError::NetworkError(_) => ErrorKind::NetworkError,
                StoreError::AllGatewaysFailed { .. } => ErrorKind::AllGatewaysFailed,
                StoreError::InvalidContentId(_) => ErrorKind::InvalidContentId,
            },
            Self::Registry(e) => match e {
                RegistryError::NotConnected => ErrorKind::NotConnected,
                RegistryError::SigningRejected(_) => ErrorKind::SigningRejected,
                RegistryError::SubmitFailed(_) => ErrorKind::SubmitFailed,
                RegistryError::ConfirmationReverted { .. } => ErrorKind::ConfirmationReverted,
                RegistryError::ReadFailed(_) => ErrorKind::ReadFailed,
                RegistryError::Config(_) => ErrorKind::NotConfigured,
            },
        }
    }
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
