//! Append-only query log backed by a sled tree.
//!
//! Keys are big-endian sequence numbers so iteration order is application
//! order. Values are bincode-encoded [`LogEntry`] records. Entries are never
//! rewritten or removed.

use crate::catalog::Catalog;
use crate::error::{MalformedLogEntry, Result};
use crate::feedback;
use crate::request::QueryRequest;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

/// Name of the sled tree holding log entries.
pub const LOG_TREE: &str = "query_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Audit record of a served request; carries no popularity credit.
    Recommendation,
    /// Accepted feedback; replayed into popularity at startup.
    Feedback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub recorded_at: String,
    pub kind: EntryKind,
    pub request: Option<QueryRequest>,
    pub titles: Vec<String>,
}

pub struct QueryLog {
    db: sled::Db,
    entries: sled::Tree,
}

impl QueryLog {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::with_db(sled::open(dir)?)
    }

    /// A log that is discarded when dropped.
    pub fn temporary() -> Result<Self> {
        Self::with_db(sled::Config::new().temporary(true).open()?)
    }

    fn with_db(db: sled::Db) -> Result<Self> {
        let entries = db.open_tree(LOG_TREE)?;
        Ok(Self { db, entries })
    }

    /// Write one entry. Feedback entries are flushed to disk before returning;
    /// audit entries ride on sled's periodic flush.
    pub fn append(&self, kind: EntryKind, request: Option<QueryRequest>, titles: Vec<String>) -> Result<LogEntry> {
        // sled persists its id counter, so sequence numbers keep rising across restarts
        let seq = self.db.generate_id()?;
        let recorded_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        let entry = LogEntry { seq, recorded_at, kind, request, titles };
        let bytes = bincode::serialize(&entry)?;
        self.entries.insert(seq.to_be_bytes(), bytes)?;
        if kind == EntryKind::Feedback {
            self.entries.flush()?;
        }
        Ok(entry)
    }

    /// Stored records in sequence order, decoded one at a time. Undecodable
    /// records come back as [`MalformedLogEntry`]; only storage failures are errors.
    pub fn iter(&self) -> impl Iterator<Item = Result<std::result::Result<LogEntry, MalformedLogEntry>>> + '_ {
        self.entries.iter().map(|kv| -> Result<_> {
            let (key, value) = kv?;
            Ok(decode(&key, &value))
        })
    }

    /// Every stored record, collected. Prefer [`QueryLog::iter`] for large logs.
    pub fn entries(&self) -> Result<Vec<std::result::Result<LogEntry, MalformedLogEntry>>> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Drop for QueryLog {
    fn drop(&mut self) {
        if let Err(err) = self.db.flush() {
            tracing::warn!(%err, "failed to flush query log on shutdown");
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Feedback entries credited to the catalog.
    pub applied: usize,
    /// Entries that could not be decoded or no longer match the catalog.
    pub skipped: usize,
    /// Recommendation audit entries seen.
    pub audited: usize,
}

/// Re-apply every logged feedback event, in log order, to a freshly loaded catalog.
///
/// Takes the catalog exclusively: this runs before anything is served. Bad
/// entries are skipped with a warning and the rest of the log still applies.
pub fn replay(catalog: &mut Catalog, log: &QueryLog, increment: f64) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();
    for record in log.iter() {
        let entry = match record? {
            Ok(entry) => entry,
            Err(bad) => {
                tracing::warn!(%bad, "skipping malformed query log entry");
                report.skipped += 1;
                continue;
            }
        };
        match entry.kind {
            EntryKind::Recommendation => report.audited += 1,
            EntryKind::Feedback => match feedback::resolve(catalog, &entry.titles) {
                Ok(ids) => {
                    feedback::apply(catalog.popularity_mut(), &ids, increment);
                    report.applied += 1;
                }
                Err(err) => {
                    tracing::warn!(seq = entry.seq, %err, "skipping feedback entry that does not match the catalog");
                    report.skipped += 1;
                }
            },
        }
    }
    tracing::info!(applied = report.applied, skipped = report.skipped, audited = report.audited, "query log replayed");
    Ok(report)
}

fn decode(key: &[u8], value: &[u8]) -> std::result::Result<LogEntry, MalformedLogEntry> {
    let malformed = |reason: String| MalformedLogEntry { key: key.to_vec(), reason };
    let key_seq = <[u8; 8]>::try_from(key)
        .map(u64::from_be_bytes)
        .map_err(|_| malformed(format!("key has {} bytes, expected 8", key.len())))?;
    let entry: LogEntry = bincode::deserialize(value).map_err(|e| malformed(e.to_string()))?;
    if entry.seq != key_seq {
        return Err(malformed(format!("entry seq {} does not match key {}", entry.seq, key_seq)));
    }
    Ok(entry)
}
