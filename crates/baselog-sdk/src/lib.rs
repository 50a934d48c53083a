//! High-level SDK for BaseLog.
//!
//! Wires the content store, the registry and the commit pipeline behind one
//! [`Journal`] value, loads them from a single TOML configuration, and joins
//! an account's transactions (from an HTTP indexer or an in-memory source)
//! with the registry to show which ones carry a note.

pub mod config;
pub mod enrich;
pub mod error;
pub mod indexer;
pub mod journal;
pub mod source;

pub use config::{IndexerConfig, JournalConfig};
pub use enrich::enrich_transactions;
pub use error::{SdkError, SdkResult};
pub use indexer::HttpTransactionSource;
pub use journal::{draft_note, Journal, JournalNote, RemoteJournal};
pub use source::{StaticTransactionSource, TransactionSource};

// Re-export key types
pub use baselog_pipeline::{CommitOutcome, ErrorKind, Phase, PipelineError, PipelineState};
pub use baselog_registry::{Inclusion, TransactionHandle};
pub use baselog_types::{
    Address, ContentId, Direction, EnrichedTransaction, JournalMetadata, RegistryEntry,
    Transaction, TxHash,
};
