//! The read-side handle returned by [`crate::Cache::read`].

use std::fs::File;
use std::io::Read;

use crate::error::{CacheError, Result};

/// A consistent read handle bundling `V` independently-closeable input
/// streams for one entry, captured atomically with respect to concurrent
/// edits. Reading from a `Snapshot` never requires the cache's lock.
pub struct Snapshot {
    values: Vec<File>,
}

impl Snapshot {
    pub(crate) fn new(values: Vec<File>) -> Self {
        Snapshot { values }
    }

    /// Borrows the `index`-th stream, unbuffered.
    pub fn get_input_stream(&self, index: usize) -> Result<&File> {
        self.values
            .get(index)
            .ok_or(CacheError::InvalidIndex(index))
    }

    /// Drains the `index`-th stream fully as UTF-8.
    pub fn get_string(&self, index: usize) -> Result<String> {
        let mut stream = self.get_input_stream(index)?;
        let mut buf = String::new();
        stream.read_to_string(&mut buf)?;
        Ok(buf)
    }

    /// Number of values carried by this snapshot.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether this snapshot carries zero values (only possible for a
    /// cache opened with `value_count == 0`).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Closes every stream. Equivalent to dropping the `Snapshot`; I/O
    /// errors on close are swallowed, same as the OS closing file handles
    /// on drop.
    pub fn close(self) {}
}
