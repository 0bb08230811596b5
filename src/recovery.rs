//! Rebuilds the in-memory index from an existing journal on [`crate::Cache::open`],
//! then deletes any dirty files left behind by an edit that never reached a
//! `CLEAN` or `REMOVE` record.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::index::LruIndex;
use crate::journal::{self, Record};
use crate::paths;

pub(crate) fn read_journal(dir: &Path, value_count: usize) -> Result<LruIndex> {
    let content = fs::read_to_string(paths::journal_path(dir))?;

    // Split on '\n' and drop the final fragment. If the file ends with a
    // newline, that fragment is the empty string left by the trailing
    // delimiter. If it doesn't, the fragment is a record that was only
    // partially flushed before a crash and must be tolerated rather than
    // treated as corruption, so in either case it is simply dropped.
    let mut raw_lines: Vec<&str> = content.split('\n').collect();
    raw_lines.pop();
    let mut lines = raw_lines.into_iter();

    journal::parse_header(&mut lines, value_count)?;

    let mut index = LruIndex::new();
    let mut dangling: HashSet<String> = HashSet::new();

    for line in lines {
        match journal::parse_record(line, value_count)? {
            Record::Dirty(key) => {
                index.get_or_insert_promote(&key, value_count);
                dangling.insert(key);
            }
            Record::Clean(key, lengths) => {
                let entry = index.get_or_insert_promote(&key, value_count);
                entry.readable = true;
                entry.lengths = lengths;
                dangling.remove(&key);
            }
            Record::Remove(key) => {
                index.remove(&key);
                dangling.remove(&key);
            }
            Record::Read(key) => {
                index.promote(&key);
            }
        }
    }

    collect_garbage(dir, value_count, &mut index, &dangling)?;

    Ok(index)
}

/// Deletes `journal.tmp` (an interrupted compaction) and every file
/// belonging to an entry whose last journal record was `DIRTY` with no
/// matching `CLEAN`/`REMOVE` — a half-published edit must not survive a
/// crash.
fn collect_garbage(
    dir: &Path,
    value_count: usize,
    index: &mut LruIndex,
    dangling: &HashSet<String>,
) -> Result<()> {
    let tmp = paths::journal_tmp_path(dir);
    if tmp.exists() {
        fs::remove_file(&tmp)?;
    }

    for key in dangling {
        for i in 0..value_count {
            remove_if_present(&paths::clean_path(dir, key, i))?;
            remove_if_present(&paths::dirty_path(dir, key, i))?;
        }
        index.remove(key);
    }

    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
