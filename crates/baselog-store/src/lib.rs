//! Content store client for BaseLog.
//!
//! Journal notes are pinned to a content-addressed network through a single
//! authenticated write endpoint and read back through an ordered list of
//! public gateways. The store hands back an opaque [`ContentId`] that the
//! registry later records on-chain.
//!
//! # Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`HttpContentStore`] -- pinning-service API over HTTPS
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. The stored payload is always the versioned envelope, never the bare
//!    caller object.
//! 2. Uploads are single-shot: failures surface to the caller, nothing is
//!    retried internally.
//! 3. Reads fall back across gateways in order and only fail once every
//!    gateway has failed.
//! 4. An upload is not transactional with anything downstream; an orphaned
//!    pin is acceptable garbage.
//!
//! [`ContentId`]: baselog_types::ContentId

pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use config::StoreConfig;
pub use envelope::{envelope, IndexTags, PinRequest};
pub use error::{GatewayFailure, StoreError, StoreResult};
pub use http::HttpContentStore;
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
