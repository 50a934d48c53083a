/// Why a single gateway read failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayReason {
    #[error("timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed body: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// A gateway read failure, tagged with the gateway that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("gateway {gateway}: {reason}")]
pub struct GatewayFailure {
    pub gateway: String,
    #[source]
    pub reason: GatewayReason,
}

/// Errors from content store operations.
///
/// None of these are retried by the client; retry is the caller's call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Required configuration (credential or gateways) is missing.
    #[error("content store not configured: {0}")]
    NotConfigured(String),

    /// The store rejected the credential.
    #[error("content store rejected the credential (HTTP {status})")]
    AuthFailed { status: u16 },

    /// The store is throttling requests.
    #[error("content store rate limit exceeded")]
    RateLimited,

    /// Any other store-side failure, with the store's message.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// No response was received from the store.
    #[error("network error: {0}")]
    NetworkError(String),

    /// Every configured gateway failed; carries the last failure.
    #[error("all {attempts} gateways failed")]
    AllGatewaysFailed {
        attempts: usize,
        #[source]
        last: GatewayFailure,
    },

    /// The content id was empty.
    #[error("invalid content id: {0:?}")]
    InvalidContentId(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
