//! The journal file format: four fixed ASCII header lines followed by
//! space-separated body records.

use std::io::{self, Write};

use crate::error::{CacheError, Result};

pub(crate) const MAGIC: &str = "libcore.io.DiskLruCache";
pub(crate) const VERSION: &str = "1";

/// One parsed body record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Record {
    /// An `Editor` was opened for this key.
    Dirty(String),
    /// An `Editor` committed; the entry is now readable with these lengths.
    Clean(String, Vec<u64>),
    /// The entry was removed, explicitly or via abort of a never-published
    /// edit.
    Remove(String),
    /// The entry was read (affects LRU order on recovery only).
    Read(String),
}

pub(crate) fn write_header(w: &mut impl Write, value_count: usize) -> io::Result<()> {
    writeln!(w, "{MAGIC}")?;
    writeln!(w, "{VERSION}")?;
    writeln!(w, "{value_count}")?;
    writeln!(w)
}

pub(crate) fn write_record(w: &mut impl Write, record: &Record) -> io::Result<()> {
    match record {
        Record::Dirty(key) => writeln!(w, "DIRTY {key}"),
        Record::Clean(key, lengths) => {
            write!(w, "CLEAN {key}")?;
            for len in lengths {
                write!(w, " {len}")?;
            }
            writeln!(w)
        }
        Record::Remove(key) => writeln!(w, "REMOVE {key}"),
        Record::Read(key) => writeln!(w, "READ {key}"),
    }
}

fn corrupt(msg: impl Into<String>) -> CacheError {
    CacheError::CorruptJournal(msg.into())
}

/// Validates the four fixed header lines against `lines`, an iterator over
/// the journal's raw lines with any trailing unterminated fragment already
/// stripped by the caller.
pub(crate) fn parse_header<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    value_count: usize,
) -> Result<()> {
    let magic = lines.next().ok_or_else(|| corrupt("missing magic line"))?;
    if magic != MAGIC {
        return Err(corrupt(format!("unexpected magic {magic:?}")));
    }

    let version = lines.next().ok_or_else(|| corrupt("missing version line"))?;
    if version != VERSION {
        return Err(corrupt(format!("unexpected version {version:?}")));
    }

    let count_field = lines
        .next()
        .ok_or_else(|| corrupt("missing value-count line"))?;
    let count: usize = count_field
        .parse()
        .map_err(|_| corrupt(format!("non-numeric value count {count_field:?}")))?;
    if count != value_count {
        return Err(corrupt(format!(
            "value count mismatch: journal has {count}, caller asked for {value_count}"
        )));
    }

    let blank = lines
        .next()
        .ok_or_else(|| corrupt("missing blank header line"))?;
    if !blank.is_empty() {
        return Err(corrupt("fourth header line is not blank"));
    }

    Ok(())
}

pub(crate) fn parse_record(line: &str, value_count: usize) -> Result<Record> {
    let mut fields = line.split(' ');
    let op = fields.next().unwrap_or("");
    let key = fields
        .next()
        .ok_or_else(|| corrupt(format!("record missing key: {line:?}")))?;

    match op {
        "DIRTY" => {
            ensure_exhausted(&mut fields, line)?;
            Ok(Record::Dirty(key.to_string()))
        }
        "REMOVE" => {
            ensure_exhausted(&mut fields, line)?;
            Ok(Record::Remove(key.to_string()))
        }
        "READ" => {
            ensure_exhausted(&mut fields, line)?;
            Ok(Record::Read(key.to_string()))
        }
        "CLEAN" => {
            let mut lengths = Vec::with_capacity(value_count);
            for _ in 0..value_count {
                let field = fields
                    .next()
                    .ok_or_else(|| corrupt(format!("CLEAN record missing length: {line:?}")))?;
                let len: u64 = field
                    .parse()
                    .map_err(|_| corrupt(format!("non-decimal length {field:?} in {line:?}")))?;
                lengths.push(len);
            }
            ensure_exhausted(&mut fields, line)?;
            Ok(Record::Clean(key.to_string(), lengths))
        }
        other => Err(corrupt(format!("unrecognized record {other:?} in {line:?}"))),
    }
}

fn ensure_exhausted<'a>(fields: &mut impl Iterator<Item = &'a str>, line: &str) -> Result<()> {
    if fields.next().is_some() {
        return Err(corrupt(format!("unexpected extra fields in {line:?}")));
    }
    Ok(())
}
