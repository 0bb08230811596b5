use std::fs;

use disklru::Cache;
use disklru::{CacheError, Result};

fn open(dir: &std::path::Path, values: usize, max_size: u64) -> Result<Cache> {
    Cache::open(dir, values, max_size)
}

#[test]
fn create_and_read() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 2, 1_000_000_000)?;

    let editor = cache.edit("a")?.unwrap();
    editor.set(0, "hello")?;
    editor.set(1, "world")?;
    editor.commit()?;

    let snapshot = cache.read("a")?.unwrap();
    assert_eq!(snapshot.get_string(0)?, "hello");
    assert_eq!(snapshot.get_string(1)?, "world");
    Ok(())
}

#[test]
fn partial_update_preserves_other_index() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 2, 1_000_000_000)?;

    let editor = cache.edit("a")?.unwrap();
    editor.set(0, "hello")?;
    editor.set(1, "world")?;
    editor.commit()?;

    let editor = cache.edit("a")?.unwrap();
    editor.set(0, "HI")?;
    editor.commit()?;

    let snapshot = cache.read("a")?.unwrap();
    assert_eq!(snapshot.get_string(0)?, "HI");
    assert_eq!(snapshot.get_string(1)?, "world");
    Ok(())
}

#[test]
fn abort_of_new_entry_leaves_nothing_behind() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 2, 1_000_000_000)?;

    let editor = cache.edit("b")?.unwrap();
    editor.set(0, "x")?;
    editor.abort()?;

    assert!(cache.read("b")?.is_none());
    assert!(!tmp.path().join("b.0").exists());
    assert!(!tmp.path().join("b.0.tmp").exists());
    assert!(!tmp.path().join("b.1").exists());
    Ok(())
}

#[test]
fn commit_without_all_values_on_new_entry_fails_and_cleans_up() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 2, 1_000_000_000)?;

    let editor = cache.edit("c")?.unwrap();
    editor.set(0, "only")?;
    let err = editor.commit().unwrap_err();
    assert!(matches!(err, CacheError::IncompleteEdit(1)));

    assert!(cache.read("c")?.is_none());
    assert!(!tmp.path().join("c.0").exists());
    assert!(!tmp.path().join("c.0.tmp").exists());
    Ok(())
}

#[test]
fn recovery_deletes_dangling_dirty_file() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("journal"),
        "libcore.io.DiskLruCache\n1\n1\n\nDIRTY k\n",
    )
    .unwrap();
    fs::write(tmp.path().join("k.0.tmp"), b"partial").unwrap();

    let cache = open(tmp.path(), 1, 1_000_000_000)?;
    assert!(cache.read("k")?.is_none());
    assert!(!tmp.path().join("k.0.tmp").exists());
    Ok(())
}

#[test]
fn corrupt_journal_resets_to_empty_cache() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("journal"),
        "libcore.io.DiskLruCache\n1\n1\n\nBOGUS k\n",
    )
    .unwrap();

    let cache = open(tmp.path(), 1, 1_000_000_000)?;
    assert_eq!(cache.stats(), (0, 0));
    Ok(())
}

#[test]
fn edit_returns_none_while_another_editor_is_live() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 1, 1_000_000_000)?;

    let editor = cache.edit("a")?.unwrap();
    assert!(cache.edit("a")?.is_none());
    editor.abort()?;

    assert!(cache.edit("a")?.is_some());
    Ok(())
}

#[test]
fn close_and_reopen_preserves_lengths_and_readable_set() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    {
        let cache = open(tmp.path(), 1, 1_000_000_000)?;
        let editor = cache.edit("a")?.unwrap();
        editor.set(0, "persisted")?;
        editor.commit()?;
        cache.close()?;
    }

    let cache = open(tmp.path(), 1, 1_000_000_000)?;
    let snapshot = cache.read("a")?.unwrap();
    assert_eq!(snapshot.get_string(0)?, "persisted");
    Ok(())
}

#[test]
fn eviction_enforces_max_size_in_lru_order() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    // Each value is 5 bytes; max_size fits only one entry at a time.
    let cache = open(tmp.path(), 1, 5)?;

    let e = cache.edit("a")?.unwrap();
    e.set(0, "aaaaa")?;
    e.commit()?;

    let e = cache.edit("b")?.unwrap();
    e.set(0, "bbbbb")?;
    e.commit()?;

    // "a" should have been evicted to make room for "b".
    assert!(cache.read("a")?.is_none());
    assert!(cache.read("b")?.is_some());
    Ok(())
}

#[test]
fn read_promotes_to_lru_tail_and_protects_from_eviction() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 1, 10)?;

    for key in ["a", "b"] {
        let e = cache.edit(key)?.unwrap();
        e.set(0, "xxxxx")?;
        e.commit()?;
    }
    // Touch "a" so it becomes the most-recently-used entry.
    cache.read("a")?;

    let e = cache.edit("c")?.unwrap();
    e.set(0, "xxxxx")?;
    e.commit()?;

    // "b" was least-recently-used and should be evicted instead of "a".
    assert!(cache.read("a")?.is_some());
    assert!(cache.read("b")?.is_none());
    assert!(cache.read("c")?.is_some());
    Ok(())
}

#[test]
fn rebuild_journal_preserves_live_state() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 1, 1_000_000_000)?;

    for key in ["a", "b", "c"] {
        let e = cache.edit(key)?.unwrap();
        e.set(0, key)?;
        e.commit()?;
    }
    cache.remove("b")?;
    cache.rebuild_journal()?;

    assert_eq!(cache.read("a")?.unwrap().get_string(0)?, "a");
    assert!(cache.read("b")?.is_none());
    assert_eq!(cache.read("c")?.unwrap().get_string(0)?, "c");
    Ok(())
}

#[test]
fn invalid_key_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 1, 1_000_000_000).unwrap();

    assert!(matches!(cache.read(""), Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.read("a b"), Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.edit("a\nb"), Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.edit("a\rb"), Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.edit("a/b"), Err(CacheError::InvalidKey(_))));
}

#[test]
fn remove_persists_after_reopen() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    {
        let cache = open(tmp.path(), 1, 1_000_000_000)?;
        let editor = cache.edit("a")?.unwrap();
        editor.set(0, "value")?;
        editor.commit()?;
        cache.remove("a")?;
        cache.close()?;
    }

    let cache = open(tmp.path(), 1, 1_000_000_000)?;
    assert!(cache.read("a")?.is_none());
    assert_eq!(cache.stats(), (0, 0));
    Ok(())
}

#[test]
fn reopen_replays_multi_value_clean_and_read_records() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("journal"),
        "libcore.io.DiskLruCache\n1\n2\n\nDIRTY a\nCLEAN a 5 5\nREAD a\n",
    )
    .unwrap();
    fs::write(tmp.path().join("a.0"), "hello").unwrap();
    fs::write(tmp.path().join("a.1"), "world").unwrap();

    let cache = open(tmp.path(), 2, 1_000_000_000)?;
    let snapshot = cache.read("a")?.unwrap();
    assert_eq!(snapshot.get_string(0)?, "hello");
    assert_eq!(snapshot.get_string(1)?, "world");
    Ok(())
}

#[test]
fn truncated_final_journal_record_is_tolerated() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a.0"), "ok").unwrap();
    // No trailing newline: the last record is an unterminated fragment
    // left by a crash mid-write and must be dropped, not treated as
    // corruption.
    fs::write(
        tmp.path().join("journal"),
        "libcore.io.DiskLruCache\n1\n1\n\nCLEAN a 2\nDIRTY b",
    )
    .unwrap();

    let cache = open(tmp.path(), 1, 1_000_000_000)?;
    assert!(cache.read("a")?.is_some());
    assert!(cache.read("b")?.is_none());
    Ok(())
}

#[test]
fn journal_value_count_mismatch_resets_to_empty_cache() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("journal"),
        "libcore.io.DiskLruCache\n1\n2\n\nDIRTY a\nCLEAN a 5 5\n",
    )
    .unwrap();

    let cache = open(tmp.path(), 1, 1_000_000_000)?;
    assert_eq!(cache.stats(), (0, 0));
    Ok(())
}

#[test]
fn journal_with_wrong_arity_record_resets_to_empty_cache() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("journal"),
        "libcore.io.DiskLruCache\n1\n2\n\nCLEAN a 5\n",
    )
    .unwrap();

    let cache = open(tmp.path(), 2, 2_000_000_000)?;
    assert_eq!(cache.stats(), (0, 0));
    Ok(())
}

#[test]
fn operations_after_close_fail() -> Result<()> {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 1, 1_000_000_000)?;
    cache.close()?;

    assert!(matches!(cache.read("a"), Err(CacheError::Closed)));
    assert!(matches!(cache.edit("a"), Err(CacheError::Closed)));
    Ok(())
}
