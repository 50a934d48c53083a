use baselog_types::TxHash;

/// Errors produced by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No signer is bound to the client.
    #[error("no signer connected")]
    NotConnected,

    /// The signer refused to sign the write.
    #[error("signature rejected: {0}")]
    SigningRejected(String),

    /// The write could not be submitted.
    #[error("submission failed: {0}")]
    SubmitFailed(String),

    /// The write was included but reverted.
    #[error("transaction {tx} reverted in block {block_number}")]
    ConfirmationReverted { tx: TxHash, block_number: u64 },

    /// A read could not be completed or decoded.
    #[error("registry read failed: {0}")]
    ReadFailed(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
