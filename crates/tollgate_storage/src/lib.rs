//! Durable key-value storage for Tollgate.
//!
//! The quota ledger and the response cache keep their bookkeeping in a
//! [`KeyValueStore`]: a byte-oriented get/set/delete contract that must
//! survive process restarts. The concrete backing is pluggable.
//!
//! # Backends
//!
//! - [`FileSystemStore`] - one file per key under a base directory, written atomically
//! - [`MemoryStore`] - process-local map, for tests and ephemeral runs
//!
//! # Example
//!
//! ```rust
//! use tollgate_storage::{FileSystemStore, KeyValueStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileSystemStore::new("/tmp/tollgate")?;
//!
//! store.set("usage/tokens_consumed", b"42").await?;
//! assert_eq!(store.get("usage/tokens_consumed").await?, Some(b"42".to_vec()));
//!
//! store.delete("usage/tokens_consumed").await?;
//! assert_eq!(store.get("usage/tokens_consumed").await?, None);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod json;
mod memory;

use std::sync::Arc;
use tollgate_error::TollgateResult;

pub use filesystem::FileSystemStore;
pub use json::{read_json, write_json};
pub use memory::MemoryStore;
pub use tollgate_error::{StorageError, StorageErrorKind};

/// Trait for pluggable durable key-value backends.
///
/// Keys are short `/`-separated strings such as `quota/primary/requests`.
/// Values are opaque bytes. Implementations must make a successful `set`
/// visible to every later `get`, including after a restart for durable
/// backends.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Fetch the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> TollgateResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> TollgateResult<()>;

    /// Remove `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> TollgateResult<()>;
}

/// Shared store handle.
pub type SharedStore = Arc<dyn KeyValueStore>;
