// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL event log.
//!
//! Events are durably stored before observers see them; the log is the
//! single source of truth for replay. Each entry is one line of JSON.
//!
//! A corrupt tail (partial write from a crash) is detected on open: the
//! damaged file is rotated to `.bak` and the valid prefix is preserved,
//! so recovery never loses parseable events.

use ordinex_core::{Event, TaskId};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in event log operations
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pick a `.bak` path that does not collide with an earlier rotation.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let base = PathBuf::from(format!("{}.bak", path.display()));
    if !base.exists() {
        return base;
    }
    for n in 1..u32::MAX {
        let candidate = PathBuf::from(format!("{}.bak.{n}", path.display()));
        if !candidate.exists() {
            return candidate;
        }
    }
    base
}

/// Append-only JSONL log of events.
///
/// Writes are buffered in memory; `flush()` is the durability point and
/// the bus calls it before any subscriber sees the event.
pub struct EventLog {
    file: File,
    path: PathBuf,
    /// Number of durable entries (the cold-read offset space)
    entry_count: u64,
    /// Buffered JSON lines waiting to be flushed (without trailing newline)
    write_buffer: Vec<Vec<u8>>,
}

impl EventLog {
    /// Open or create the log at the given path.
    ///
    /// Scans existing content; on a corrupt tail, rotates the file to
    /// `.bak` and rewrites only the valid prefix.
    pub fn open(path: &Path) -> Result<Self, LogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (valid_lines, corrupt) = Self::scan(&file)?;

        if corrupt {
            drop(file);
            let bak_path = rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = valid_lines.len(),
                "corrupt event log detected, rotating to .bak and preserving valid entries",
            );
            std::fs::rename(path, &bak_path)?;

            {
                let mut new_file = File::create(path)?;
                for line in &valid_lines {
                    new_file.write_all(line.as_bytes())?;
                    new_file.write_all(b"\n")?;
                }
                new_file.sync_all()?;
            }

            file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)?;
        }

        Ok(Self {
            file,
            path: path.to_owned(),
            entry_count: valid_lines.len() as u64,
            write_buffer: Vec::new(),
        })
    }

    /// Read all parseable lines, reporting whether a corrupt tail was hit.
    fn scan(file: &File) -> Result<(Vec<String>, bool), LogError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut valid_lines = Vec::new();
        let mut corrupt = false;
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    corrupt = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if serde_json::from_str::<Event>(trimmed).is_err() {
                corrupt = true;
                break;
            }

            valid_lines.push(trimmed.to_string());
        }

        Ok((valid_lines, corrupt))
    }

    /// Append an event to the write buffer.
    ///
    /// Returns the entry's offset. The event is NOT durable until
    /// `flush()` returns.
    pub fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        let json_bytes = serde_json::to_vec(event)?;
        self.write_buffer.push(json_bytes);
        let offset = self.entry_count + self.write_buffer.len() as u64 - 1;
        Ok(offset)
    }

    /// Flush all buffered entries to disk with a single fsync.
    ///
    /// This is the durability point: after flush returns successfully,
    /// all buffered events are on disk.
    pub fn flush(&mut self) -> Result<(), LogError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }

        let flushed = self.write_buffer.len() as u64;
        for mut json_bytes in self.write_buffer.drain(..) {
            json_bytes.push(b'\n');
            self.file.write_all(&json_bytes)?;
        }

        self.file.sync_all()?;
        self.entry_count += flushed;
        Ok(())
    }

    /// Number of durable entries.
    pub fn len(&self) -> u64 {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All durable events from the given offset, in insertion order.
    ///
    /// A corrupt line mid-read stops the scan at the corruption point,
    /// matching open-time behavior.
    pub fn entries_from(&self, offset: u64) -> Result<Vec<Event>, LogError> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut events = Vec::new();
        let mut index = 0u64;
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let event: Event = match serde_json::from_str(trimmed) {
                Ok(e) => e,
                Err(e) => {
                    warn!(
                        entry = index,
                        error = %e,
                        "corrupt event log entry during replay, stopping at corruption point",
                    );
                    break;
                }
            };

            if index >= offset {
                events.push(event);
            }
            index += 1;
        }

        Ok(events)
    }

    /// All durable events, in insertion order.
    pub fn entries(&self) -> Result<Vec<Event>, LogError> {
        self.entries_from(0)
    }

    /// Events for one task, in insertion order.
    pub fn events_by_task(&self, task_id: &TaskId) -> Result<Vec<Event>, LogError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| &e.task_id == task_id)
            .collect())
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
