//! Registry client for BaseLog.
//!
//! The registry is an on-chain mapping from `(account, tx hash)` to the
//! content id of a journal note and the time it was recorded. This crate
//! provides:
//! - `RegistryReader` / `RegistryWriter` trait boundaries
//! - `JsonRpcRegistry`, which talks to the registry contract through an
//!   EVM JSON-RPC endpoint
//! - `InMemoryRegistry`, a simulated chain for tests and embedding
//! - the small slice of contract ABI encoding the client needs

pub mod abi;
pub mod config;
pub mod error;
pub mod memory;
pub mod records;
pub mod rpc;
pub mod traits;

pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use memory::InMemoryRegistry;
pub use records::{Inclusion, TransactionHandle};
pub use rpc::JsonRpcRegistry;
pub use traits::{Registry, RegistryReader, RegistryWriter};
