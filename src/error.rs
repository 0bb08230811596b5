use thiserror::Error;

/// Error type for the disk cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O failure from the filesystem (open, read, write, rename, delete).
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The journal could not be parsed. Raised only internally during
    /// recovery; [`crate::Cache::open`] handles it by wiping the directory
    /// and starting from an empty cache, so callers never observe this
    /// variant.
    #[error("corrupt journal: {0}")]
    CorruptJournal(String),
    /// The key is not a valid cache key: empty, or containing a space,
    /// carriage return, line feed, or path separator.
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    /// `index` is outside `[0, V)` for this cache's value count.
    #[error("value index {0} out of range")]
    InvalidIndex(usize),
    /// The cache has already been closed.
    #[error("cache is closed")]
    Closed,
    /// `commit`/`abort` was called on an `Editor` that no longer owns its
    /// entry (it has already been committed, aborted, or force-aborted by
    /// [`crate::Cache::close`]).
    #[error("editor no longer owns its entry")]
    NotEditing,
    /// `commit` was called on a newly-created entry without writing every
    /// required value; the edit is aborted and this names the first
    /// missing index.
    #[error("edit did not produce a value for index {0}")]
    IncompleteEdit(usize),
    /// A caller-facing error with a free-form message, used outside the
    /// core cache state machine (e.g. by [`crate::thread_pool`] when a pool
    /// fails to spawn its threads).
    #[error("{0}")]
    Other(String),
}

/// Result type for disk cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
