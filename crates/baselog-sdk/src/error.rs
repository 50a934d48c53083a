use baselog_types::ContentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },

    #[error("no account bound to the journal")]
    NotConnected,

    #[error("transaction source error: {0}")]
    Source(String),

    #[error("note {content_id} is registered but could not be fetched: {source}")]
    NoteUnavailable {
        content_id: ContentId,
        #[source]
        source: baselog_store::StoreError,
    },

    #[error("store error: {0}")]
    Store(#[from] baselog_store::StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] baselog_registry::RegistryError),

    #[error("commit failed: {0}")]
    Pipeline(#[from] baselog_pipeline::PipelineError),
}

pub type SdkResult<T> = Result<T, SdkError>;
