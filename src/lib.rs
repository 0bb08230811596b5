#![deny(missing_docs)]
//! A durable, size-bounded LRU cache backed by a directory on a local
//! filesystem.
//!
//! Each entry is identified by a textual key and holds a fixed, cache-wide
//! number of independent byte-stream values. The cache survives process
//! restart: [`Cache::open`] reconstructs its in-memory index from an
//! append-only journal plus the data files it references.
//!
//! The caller owns thread-pool selection ([`thread_pool`]), size-limit
//! policy, and key generation; this crate owns only the on-disk state
//! machine.

mod cache;
mod editor;
mod entry;
mod error;
mod index;
mod journal;
mod paths;
mod recovery;
mod snapshot;
pub mod thread_pool;

pub use cache::Cache;
pub use editor::Editor;
pub use error::{CacheError, Result};
pub use snapshot::Snapshot;
