//! Pure mapping from `(directory, key, value index)` to the file paths the
//! cache owns. No I/O lives here; callers decide what to do with the paths.

use std::path::{Path, PathBuf};

use crate::error::{CacheError, Result};

const JOURNAL_FILE: &str = "journal";
const JOURNAL_TMP_FILE: &str = "journal.tmp";

/// `<dir>/journal`
pub(crate) fn journal_path(dir: &Path) -> PathBuf {
    dir.join(JOURNAL_FILE)
}

/// `<dir>/journal.tmp`, used as compaction scratch space.
pub(crate) fn journal_tmp_path(dir: &Path) -> PathBuf {
    dir.join(JOURNAL_TMP_FILE)
}

/// `<dir>/K.i`, the published value for key `K` at index `i`.
pub(crate) fn clean_path(dir: &Path, key: &str, index: usize) -> PathBuf {
    dir.join(format!("{key}.{index}"))
}

/// `<dir>/K.i.tmp`, the staging file an `Editor` writes before committing.
pub(crate) fn dirty_path(dir: &Path, key: &str, index: usize) -> PathBuf {
    dir.join(format!("{key}.{index}.tmp"))
}

/// A key is a non-empty string containing no space, carriage return, or
/// line feed. Path separators are rejected too, since keys are used
/// directly as filename components.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    if key.contains(' ') || key.contains('\n') || key.contains('\r') {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    if key.contains('/') || key.contains(std::path::MAIN_SEPARATOR) {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
