//! The cache core: coordinates the index, journal, and filesystem under a
//! single coarse mutex. This is the only module that holds the lock for
//! longer than a single helper call.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};

use crate::editor::{Editor, EditorId};
use crate::entry::Entry;
use crate::error::{CacheError, Result};
use crate::index::LruIndex;
use crate::journal::{self, Record};
use crate::paths;
use crate::recovery;
use crate::snapshot::Snapshot;

/// A rebuild never triggers below this many buffered body records,
/// regardless of how small the live set is, so a freshly-opened or
/// near-empty cache doesn't compact on every single mutation. Mirrors the
/// floor real `DiskLruCache`-style implementations use alongside the
/// "2x live entries" rule.
const MIN_RECORDS_BEFORE_COMPACTION: usize = 64;

pub(crate) struct Shared {
    dir: PathBuf,
    value_count: usize,
    max_size: u64,
    index: LruIndex,
    size: u64,
    journal: Option<BufWriter<File>>,
    journal_record_count: usize,
    next_editor_id: u64,
    closed: bool,
}

impl Shared {
    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn peek_entry(&self, key: &str) -> Option<&Entry> {
        self.index.peek(key)
    }

    fn alloc_editor_id(&mut self) -> EditorId {
        let id = EditorId(self.next_editor_id);
        self.next_editor_id += 1;
        id
    }

    fn append_record(&mut self, record: &Record) -> Result<()> {
        let journal = self.journal.as_mut().ok_or(CacheError::Closed)?;
        journal::write_record(journal, record)?;
        self.journal_record_count += 1;
        Ok(())
    }

    fn flush_journal(&mut self) -> Result<()> {
        self.journal.as_mut().ok_or(CacheError::Closed)?.flush()?;
        Ok(())
    }

    fn maybe_rebuild_journal(&mut self) -> Result<()> {
        if self.journal_record_count >= MIN_RECORDS_BEFORE_COMPACTION
            && self.journal_record_count > 2 * self.index.len()
        {
            self.rebuild_journal_locked()?;
        }
        Ok(())
    }

    fn rebuild_journal_locked(&mut self) -> Result<()> {
        if let Some(j) = self.journal.as_mut() {
            j.flush()?;
        }
        self.journal = None;

        let tmp_path = paths::journal_tmp_path(&self.dir);
        {
            let mut tmp = BufWriter::new(
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&tmp_path)?,
            );
            journal::write_header(&mut tmp, self.value_count)?;
            for (key, entry) in self.index.iter() {
                if entry.current_editor.is_some() {
                    journal::write_record(&mut tmp, &Record::Dirty(key.clone()))?;
                } else {
                    journal::write_record(
                        &mut tmp,
                        &Record::Clean(key.clone(), entry.lengths.clone()),
                    )?;
                }
            }
            tmp.flush()?;
        }
        fs::rename(&tmp_path, paths::journal_path(&self.dir))?;

        let file = OpenOptions::new()
            .append(true)
            .open(paths::journal_path(&self.dir))?;
        self.journal = Some(BufWriter::new(file));
        self.journal_record_count = 0;
        info!(
            "rebuilt journal for {:?} with {} live entries",
            self.dir,
            self.index.len()
        );
        Ok(())
    }

    fn evict_if_needed(&mut self) -> Result<()> {
        while self.size > self.max_size {
            let victim = self
                .index
                .iter()
                .find(|(_, e)| e.readable && e.current_editor.is_none())
                .map(|(k, _)| k.clone());
            let Some(key) = victim else { break };
            info!("evicting {key:?} from {:?} to stay under max_size", self.dir);
            self.remove_entry(&key)?;
        }
        Ok(())
    }

    fn remove_entry(&mut self, key: &str) -> Result<()> {
        let value_count = self.value_count;
        let dir = self.dir.clone();
        let lengths = self
            .index
            .peek(key)
            .map(|e| e.lengths.clone())
            .unwrap_or_default();

        for i in 0..value_count {
            remove_if_present(&paths::clean_path(&dir, key, i))?;
        }

        let total: u64 = lengths.iter().sum();
        self.size = self.size.saturating_sub(total);
        self.index.remove(key);
        self.append_record(&Record::Remove(key.to_string()))?;
        self.maybe_rebuild_journal()?;
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Deletes every entry inside `dir`, leaving `dir` itself in place. Used
/// both by `Cache::delete` and by `Cache::open`'s corrupt-journal recovery
/// path, which restarts as an empty cache.
fn reset_directory(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// A durable, size-bounded LRU cache backed by a directory on disk.
///
/// Every key holds a fixed, cache-wide number of independent byte-stream
/// values. The cache survives process restart: [`Cache::open`] replays the
/// on-disk journal to reconstruct its index before returning.
///
/// Cloning a `Cache` is cheap and yields another handle to the same
/// underlying directory and coarse lock — every public operation
/// serializes on one mutex for its duration, except for the byte transfer
/// through a [`Snapshot`] or an [`Editor`]'s streams, which happens after
/// the lock is released.
#[derive(Clone)]
pub struct Cache {
    shared: Arc<Mutex<Shared>>,
}

impl Cache {
    /// Opens (or creates) a cache directory holding `value_count`
    /// independent values per key, evicting least-recently-used entries
    /// once the sum of committed value lengths would exceed `max_size`.
    ///
    /// If an existing journal fails to parse, the directory's contents are
    /// deleted and the cache restarts empty rather than failing `open`.
    pub fn open(directory: impl Into<PathBuf>, value_count: usize, max_size: u64) -> Result<Cache> {
        let dir = directory.into();
        fs::create_dir_all(&dir)?;
        let journal_path = paths::journal_path(&dir);

        let index = if journal_path.exists() {
            match recovery::read_journal(&dir, value_count) {
                Ok(index) => index,
                Err(CacheError::CorruptJournal(reason)) => {
                    warn!("corrupt journal in {dir:?} ({reason}); resetting cache directory");
                    reset_directory(&dir)?;
                    LruIndex::new()
                }
                Err(e) => return Err(e),
            }
        } else {
            LruIndex::new()
        };

        let journal_file = if paths::journal_path(&dir).exists() {
            OpenOptions::new().append(true).open(&journal_path)?
        } else {
            let mut f = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&journal_path)?;
            journal::write_header(&mut f, value_count)?;
            f.flush()?;
            OpenOptions::new().append(true).open(&journal_path)?
        };

        let size = index.total_size();
        let mut shared = Shared {
            dir,
            value_count,
            max_size,
            size,
            index,
            journal: Some(BufWriter::new(journal_file)),
            journal_record_count: 0,
            next_editor_id: 1,
            closed: false,
        };

        shared.evict_if_needed()?;

        Ok(Cache {
            shared: Arc::new(Mutex::new(shared)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_open(&self) -> Result<MutexGuard<'_, Shared>> {
        let guard = self.lock();
        if guard.closed {
            return Err(CacheError::Closed);
        }
        Ok(guard)
    }

    /// Returns a [`Snapshot`] of `key`'s values, or `None` if the key is
    /// missing or has never been committed. Promotes `key` to the
    /// most-recently-used position.
    pub fn read(&self, key: &str) -> Result<Option<Snapshot>> {
        paths::validate_key(key)?;
        let mut shared = self.lock_open()?;

        if !matches!(shared.peek_entry(key), Some(e) if e.readable) {
            return Ok(None);
        }

        shared.append_record(&Record::Read(key.to_string()))?;
        shared.index.promote(key);
        shared.maybe_rebuild_journal()?;

        let dir = shared.dir.clone();
        let value_count = shared.value_count;
        let mut files = Vec::with_capacity(value_count);
        for i in 0..value_count {
            files.push(File::open(paths::clean_path(&dir, key, i))?);
        }
        Ok(Some(Snapshot::new(files)))
    }

    /// Opens an [`Editor`] for `key`, or `None` if `key` is already being
    /// edited by another live `Editor`.
    pub fn edit(&self, key: &str) -> Result<Option<Editor>> {
        paths::validate_key(key)?;
        let mut shared = self.lock_open()?;
        let value_count = shared.value_count;

        {
            let entry = shared.index.get_or_insert(key, value_count);
            if entry.current_editor.is_some() {
                return Ok(None);
            }
        }

        let id = shared.alloc_editor_id();
        shared
            .index
            .get_mut(key)
            .expect("key was just inserted or already present")
            .current_editor = Some(id);

        shared.append_record(&Record::Dirty(key.to_string()))?;
        shared.flush_journal()?;

        Ok(Some(Editor::new(
            Arc::clone(&self.shared),
            key.to_string(),
            id,
            value_count,
        )))
    }

    /// Removes `key`, or returns `false` if it is missing or currently
    /// being edited.
    pub fn remove(&self, key: &str) -> Result<bool> {
        paths::validate_key(key)?;
        let mut shared = self.lock_open()?;
        match shared.peek_entry(key) {
            None => return Ok(false),
            Some(e) if e.current_editor.is_some() => return Ok(false),
            _ => {}
        }
        shared.remove_entry(key)?;
        Ok(true)
    }

    /// Aborts every in-flight editor, then closes the journal handle.
    /// Idempotent. Further operations fail with [`CacheError::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut shared = self.lock();
        if shared.closed {
            return Ok(());
        }

        let editing: Vec<(String, EditorId)> = shared
            .index
            .iter()
            .filter_map(|(k, e)| e.current_editor.map(|id| (k.clone(), id)))
            .collect();

        for (key, id) in editing {
            if let Err(e) = complete_edit_locked(&mut shared, &key, id, false) {
                warn!("failed to abort in-flight editor for {key:?} on close: {e}");
            }
        }

        if let Some(j) = shared.journal.as_mut() {
            if let Err(e) = j.flush() {
                warn!("failed to flush journal on close: {e}");
            }
        }
        shared.journal = None;
        shared.closed = true;
        Ok(())
    }

    /// Closes the cache, then recursively deletes the directory's
    /// contents.
    pub fn delete(&self) -> Result<()> {
        self.close()?;
        let shared = self.lock();
        reset_directory(&shared.dir)
    }

    /// Returns `(live entry count, total size in bytes of readable entries)`.
    pub fn stats(&self) -> (usize, u64) {
        let shared = self.lock();
        (shared.index.len(), shared.size)
    }

    /// Forces an immediate journal compaction: rewrites the journal from
    /// the current live set, discarding `REMOVE`/`READ` history. Ordinary
    /// mutations trigger this automatically once the journal accumulates
    /// enough redundant records; this method exists for callers that want
    /// to force it (e.g. before a backup).
    pub fn rebuild_journal(&self) -> Result<()> {
        let mut shared = self.lock_open()?;
        shared.rebuild_journal_locked()
    }
}

/// Completes an edit started via [`Cache::edit`]. Called by [`Editor::commit`]/
/// [`Editor::abort`], and internally by [`Cache::close`] to force-abort
/// in-flight editors.
pub(crate) fn complete_edit(
    shared: &Arc<Mutex<Shared>>,
    key: &str,
    id: EditorId,
    success: bool,
) -> Result<()> {
    let mut guard = shared.lock().unwrap_or_else(|p| p.into_inner());
    if guard.closed {
        return Err(CacheError::Closed);
    }
    complete_edit_locked(&mut guard, key, id, success)
}

fn complete_edit_locked(shared: &mut Shared, key: &str, id: EditorId, success: bool) -> Result<()> {
    let owns = matches!(
        shared.peek_entry(key).and_then(|e| e.current_editor),
        Some(owner) if owner == id
    );
    if !owns {
        return Err(CacheError::NotEditing);
    }

    let value_count = shared.value_count;
    let dir = shared.dir.clone();
    let already_readable = shared
        .peek_entry(key)
        .expect("ownership check above guarantees presence")
        .readable;

    if success && !already_readable {
        for i in 0..value_count {
            if !paths::dirty_path(&dir, key, i).exists() {
                complete_edit_locked(shared, key, id, false)?;
                return Err(CacheError::IncompleteEdit(i));
            }
        }
    }

    let mut lengths = shared
        .peek_entry(key)
        .expect("ownership check above guarantees presence")
        .lengths
        .clone();
    let old_total: u64 = if already_readable {
        lengths.iter().sum()
    } else {
        0
    };

    for (i, length) in lengths.iter_mut().enumerate() {
        let dirty = paths::dirty_path(&dir, key, i);
        if success {
            if dirty.exists() {
                let clean = paths::clean_path(&dir, key, i);
                fs::rename(&dirty, &clean)?;
                *length = fs::metadata(&clean)?.len();
            }
            // A missing dirty file here is only reachable when
            // `already_readable` is true: the caller chose to preserve
            // this index's prior published value.
        } else {
            remove_if_present(&dirty)?;
        }
    }
    let new_total: u64 = lengths.iter().sum();

    {
        let entry = shared
            .index
            .get_mut(key)
            .expect("ownership check above guarantees presence");
        entry.current_editor = None;
        if already_readable || success {
            entry.readable = true;
            entry.lengths = lengths.clone();
        }
    }

    if already_readable || success {
        shared.size = shared.size - old_total + new_total;
        shared.append_record(&Record::Clean(key.to_string(), lengths))?;
        // Promotion happens on a successful commit only, never on abort,
        // regardless of whether the entry was already readable.
        if success {
            shared.index.promote(key);
        }
    } else {
        shared.index.remove(key);
        shared.append_record(&Record::Remove(key.to_string()))?;
    }

    shared.maybe_rebuild_journal()?;
    if success {
        shared.evict_if_needed()?;
    }

    Ok(())
}
