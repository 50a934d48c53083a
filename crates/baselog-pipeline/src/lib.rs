//! Commit pipeline for BaseLog.
//!
//! A note is committed in three steps: the content is uploaded to the
//! content store, the resulting content id is written to the registry under
//! the annotated transaction's hash, and the pipeline waits until that write
//! is included. The pipeline exposes its progress as a [`PipelineState`]
//! that can be sampled with `snapshot()` or followed with `subscribe()`.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use baselog_pipeline::{CommitPipeline, Phase, PipelineConfig};
//! use baselog_registry::InMemoryRegistry;
//! use baselog_store::InMemoryContentStore;
//! use baselog_types::{Address, JournalMetadata, TxHash};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = Arc::new(InMemoryRegistry::new());
//! registry.connect(Address::from_bytes([1; 20]));
//! let pipeline = CommitPipeline::new(
//!     Arc::new(InMemoryContentStore::new()),
//!     registry,
//!     PipelineConfig::default(),
//! );
//!
//! let note = JournalMetadata::new("Coffee", TxHash::from_bytes([2; 32]), 1_700_000_000_000);
//! let outcome = pipeline.commit(note).await.unwrap();
//! assert_eq!(pipeline.snapshot().phase(), Phase::Success);
//! assert!(!outcome.content_id.as_str().is_empty());
//! # });
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod state;

pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use pipeline::CommitPipeline;
pub use state::{Attempt, CommitOutcome, Phase, PipelineState, StepResult};
