//! Foundation types for BaseLog.
//!
//! BaseLog attaches a permanent note to an on-chain transaction: the note
//! body lives in a content-addressed store and an on-chain registry maps
//! `(account, tx hash)` to the note's content identifier. Every other
//! BaseLog crate depends on `baselog-types`.
//!
//! # Key Types
//!
//! - [`TxHash`]: 32-byte transaction hash, `0x`-prefixed hex on the wire
//! - [`Address`]: 20-byte account address
//! - [`ContentId`]: opaque content identifier issued by the store
//! - [`JournalMetadata`]: the caller-supplied note body
//! - [`EnrichedMetadata`]: the versioned envelope actually stored
//! - [`RegistryEntry`]: what the registry records per `(account, tx hash)`
//! - [`Transaction`] / [`EnrichedTransaction`]: transaction-source rows

pub mod content;
pub mod entry;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod transaction;

pub use content::ContentId;
pub use entry::RegistryEntry;
pub use error::TypeError;
pub use hash::{Address, TxHash};
pub use metadata::{EnrichedMetadata, JournalMetadata, StoredNote, SCHEMA_VERSION};
pub use transaction::{format_eth, Direction, EnrichedTransaction, Transaction};
