// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-file embedded key-value store for build identity and history.
//!
//! The database is an append-only sequence of JSON lines, one record
//! per line: `{"bucket":..,"key":..,"value":..}\n`. On open the log is
//! replayed into in-memory bucket maps; the latest record for a key
//! wins. Two buckets exist: `global` (the monotonic id counter plus
//! opaque operator records) and `history` (build id to the latest
//! `BuildUpdate` snapshot).
//!
//! Every write is appended and fsynced before the call returns, so a
//! committed record survives a crash and an allocated id is never
//! reused. A corrupt tail (torn final write) is truncated at the first
//! unparseable line, with the damaged file preserved as `.bak`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};
use wake_core::BuildUpdate;

/// Global-bucket key holding the monotonic build id counter.
const COUNT_KEY: &str = "count";

/// Minimum number of dead records before an open triggers compaction.
const COMPACT_FLOOR: usize = 256;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt record for {bucket}/{key}: {message}")]
    Corrupt {
        bucket: String,
        key: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Bucket {
    Global,
    History,
}

/// One on-disk record. History keys are the build id encoded as the
/// 16 hex digits of its big-endian 8-byte form, so lexicographic key
/// order equals id order.
#[derive(Serialize, Deserialize)]
struct DbRecord {
    bucket: Bucket,
    key: String,
    value: serde_json::Value,
}

fn history_key(id: u64) -> String {
    format!("{id:016x}")
}

/// Persistent, transactional key-value store with `global` and
/// `history` buckets.
///
/// All operations take the inner lock briefly; each call observes a
/// consistent snapshot.
pub struct Store {
    inner: Mutex<Inner>,
}

struct Inner {
    file: File,
    path: PathBuf,
    global: BTreeMap<String, String>,
    history: BTreeMap<u64, BuildUpdate>,
    /// Records superseded by a later write; drives compaction.
    dead: usize,
}

impl Store {
    /// Open or create the database file at `path`.
    ///
    /// Replays the log into memory, truncating a corrupt tail (the
    /// damaged file is rotated to `.bak` first) and compacting when the
    /// log carries more dead than live records.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let scan = scan_log(&file)?;

        if scan.corrupt {
            let bak_path = path.with_extension("db.bak");
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_records = scan.valid_lines.len(),
                "corrupt store tail detected, rotating to .bak and keeping valid records",
            );
            drop(file);
            std::fs::rename(path, &bak_path)?;
            let mut clean = File::create(path)?;
            for line in &scan.valid_lines {
                clean.write_all(line.as_bytes())?;
                clean.write_all(b"\n")?;
            }
            clean.sync_all()?;
        }

        // Re-open in append mode after a potential rewrite
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut inner = Inner {
            file,
            path: path.to_owned(),
            global: scan.global,
            history: scan.history,
            dead: scan.dead,
        };

        let live = inner.global.len() + inner.history.len();
        if inner.dead > live && inner.dead >= COMPACT_FLOOR {
            debug!(dead = inner.dead, live, "compacting store on open");
            inner.compact()?;
        }

        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Allocate the next build id.
    ///
    /// Strictly monotonic under concurrent callers; the new counter
    /// value is durable before the id is returned.
    pub fn allocate_id(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let current = match inner.global.get(COUNT_KEY) {
            Some(raw) => raw.parse::<u64>().map_err(|e| StoreError::Corrupt {
                bucket: "global".to_string(),
                key: COUNT_KEY.to_string(),
                message: e.to_string(),
            })?,
            None => 0,
        };
        let next = current + 1;
        inner.append(&DbRecord {
            bucket: Bucket::Global,
            key: COUNT_KEY.to_string(),
            value: serde_json::Value::String(next.to_string()),
        })?;
        inner
            .global
            .insert(COUNT_KEY.to_string(), next.to_string());
        Ok(next)
    }

    /// Upsert the history record for `update.id`.
    pub fn put_history(&self, update: &BuildUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.append(&DbRecord {
            bucket: Bucket::History,
            key: history_key(update.id),
            value: serde_json::to_value(update)?,
        })?;
        if inner.history.insert(update.id, update.clone()).is_some() {
            inner.dead += 1;
        }
        Ok(())
    }

    /// Fetch the latest history record for a build, if any.
    pub fn get_history(&self, id: u64) -> Option<BuildUpdate> {
        self.inner.lock().history.get(&id).cloned()
    }

    /// Up to `limit` history records in descending id order.
    pub fn iter_history_desc(&self, limit: usize) -> Vec<BuildUpdate> {
        let inner = self.inner.lock();
        inner
            .history
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Upsert an opaque operator record in the global bucket.
    pub fn put_global(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.append(&DbRecord {
            bucket: Bucket::Global,
            key: key.to_string(),
            value: serde_json::Value::String(value.to_string()),
        })?;
        if inner
            .global
            .insert(key.to_string(), value.to_string())
            .is_some()
        {
            inner.dead += 1;
        }
        Ok(())
    }

    /// Read an operator record from the global bucket.
    pub fn get_global(&self, key: &str) -> Option<String> {
        self.inner.lock().global.get(key).cloned()
    }

    /// Rewrite the log so it holds exactly one record per live key.
    pub fn compact(&self) -> Result<(), StoreError> {
        self.inner.lock().compact()
    }
}

impl Inner {
    /// Append one record and fsync. This is the durability point.
    fn append(&mut self, record: &DbRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Rewrite via temp file + fsync + atomic rename, then fsync the
    /// directory so the rename survives power loss.
    fn compact(&mut self) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("db.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for (key, value) in &self.global {
                let mut line = serde_json::to_vec(&DbRecord {
                    bucket: Bucket::Global,
                    key: key.clone(),
                    value: serde_json::Value::String(value.clone()),
                })?;
                line.push(b'\n');
                tmp.write_all(&line)?;
            }
            for (id, update) in &self.history {
                let mut line = serde_json::to_vec(&DbRecord {
                    bucket: Bucket::History,
                    key: history_key(*id),
                    value: serde_json::to_value(update)?,
                })?;
                line.push(b'\n');
                tmp.write_all(&line)?;
            }
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        self.dead = 0;
        Ok(())
    }
}

struct ScanResult {
    global: BTreeMap<String, String>,
    history: BTreeMap<u64, BuildUpdate>,
    valid_lines: Vec<String>,
    dead: usize,
    corrupt: bool,
}

/// Replay the log, stopping at the first unparseable line.
fn scan_log(file: &File) -> Result<ScanResult, StoreError> {
    let mut reader = BufReader::new(file.try_clone()?);
    reader.seek(SeekFrom::Start(0))?;

    let mut result = ScanResult {
        global: BTreeMap::new(),
        history: BTreeMap::new(),
        valid_lines: Vec::new(),
        dead: 0,
        corrupt: false,
    };
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                result.corrupt = true;
                break;
            }
            Err(e) => return Err(e.into()),
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: DbRecord = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(_) => {
                result.corrupt = true;
                break;
            }
        };

        match record.bucket {
            Bucket::Global => {
                let Some(value) = record.value.as_str() else {
                    result.corrupt = true;
                    break;
                };
                if result
                    .global
                    .insert(record.key.clone(), value.to_string())
                    .is_some()
                {
                    result.dead += 1;
                }
            }
            Bucket::History => {
                let Ok(id) = u64::from_str_radix(&record.key, 16) else {
                    result.corrupt = true;
                    break;
                };
                let update: BuildUpdate = match serde_json::from_value(record.value) {
                    Ok(u) => u,
                    Err(_) => {
                        result.corrupt = true;
                        break;
                    }
                };
                if result.history.insert(id, update).is_some() {
                    result.dead += 1;
                }
            }
        }

        result.valid_lines.push(trimmed.to_string());
    }

    Ok(result)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
