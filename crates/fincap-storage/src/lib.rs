//! fincap Storage - key-value persistence.
//!
//! The registry keeps one configuration document per plugin and needs
//! nothing more than namespaced `get`/`set` with durable writes. Two
//! implementations of [`KvStore`] are provided:
//!
//! - [`MemoryKvStore`]: ephemeral, for tests and throwaway sessions.
//! - [`FileKvStore`]: a single pretty-printed JSON file, rewritten atomically
//!   on every mutation and read back once when opened.
//!
//! [`ScopedKvStore`] pre-binds a namespace and adds typed JSON helpers.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod file;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use file::FileKvStore;
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore};
