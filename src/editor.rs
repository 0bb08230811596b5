//! The transactional write handle returned by [`crate::Cache::edit`].

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::cache::{self, Shared};
use crate::error::{CacheError, Result};
use crate::paths;

/// Identity token distinguishing one `edit()` call for a key from the next.
/// Entries store the token of whichever `Editor` currently owns them, so
/// `commit`/`abort` can be rejected once a different edit has taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EditorId(pub(crate) u64);

/// A transactional write handle for one entry.
///
/// Created by [`crate::Cache::edit`]. Exactly one of [`Editor::commit`] or
/// [`Editor::abort`] should be called; dropping an `Editor` without calling
/// either aborts it automatically, releasing its dirty files.
pub struct Editor {
    shared: Arc<Mutex<Shared>>,
    key: String,
    id: EditorId,
    value_count: usize,
    done: bool,
}

impl Editor {
    pub(crate) fn new(shared: Arc<Mutex<Shared>>, key: String, id: EditorId, value_count: usize) -> Self {
        Editor {
            shared,
            key,
            id,
            value_count,
            done: false,
        }
    }

    fn check_owns(&self) -> Result<()> {
        let shared = self.shared.lock().unwrap_or_else(|p| p.into_inner());
        match shared.peek_entry(&self.key).and_then(|e| e.current_editor) {
            Some(id) if id == self.id => Ok(()),
            _ => Err(CacheError::NotEditing),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.value_count {
            return Err(CacheError::InvalidIndex(index));
        }
        Ok(())
    }

    /// Opens the currently-published clean file for `index`, or `None` if
    /// the entry has never been committed. Unrelated to this editor's own
    /// in-progress writes.
    pub fn new_input_stream(&self, index: usize) -> Result<Option<File>> {
        self.check_index(index)?;
        self.check_owns()?;

        let (dir, readable) = {
            let shared = self.shared.lock().unwrap_or_else(|p| p.into_inner());
            let readable = shared
                .peek_entry(&self.key)
                .map(|e| e.readable)
                .unwrap_or(false);
            (shared.dir().to_path_buf(), readable)
        };

        if !readable {
            return Ok(None);
        }
        Ok(Some(File::open(paths::clean_path(&dir, &self.key, index))?))
    }

    /// Opens the dirty staging file for `index` for a truncating write.
    /// Ownership of the handle transfers to the caller.
    pub fn new_output_stream(&self, index: usize) -> Result<File> {
        self.check_index(index)?;
        self.check_owns()?;

        let dir = {
            let shared = self.shared.lock().unwrap_or_else(|p| p.into_inner());
            shared.dir().to_path_buf()
        };

        Ok(OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(paths::dirty_path(&dir, &self.key, index))?)
    }

    /// Convenience: writes `value` as UTF-8 to the dirty stream for `index`
    /// and closes it.
    pub fn set(&self, index: usize, value: &str) -> Result<()> {
        let mut stream = self.new_output_stream(index)?;
        stream.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Publishes the edit: every dirty file that was written is atomically
    /// renamed over its clean counterpart.
    pub fn commit(mut self) -> Result<()> {
        self.done = true;
        cache::complete_edit(&self.shared, &self.key, self.id, true)
    }

    /// Discards the edit: dirty files are deleted, and any prior
    /// published value for this key is left untouched.
    pub fn abort(mut self) -> Result<()> {
        self.done = true;
        cache::complete_edit(&self.shared, &self.key, self.id, false)
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = cache::complete_edit(&self.shared, &self.key, self.id, false) {
            debug!("editor for {:?} dropped without commit/abort: {e}", self.key);
        }
    }
}
