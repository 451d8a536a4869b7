// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint metadata types.
//!
//! The storage crate owns the snapshot bytes; these records describe them
//! and travel inside events and the checkpoint index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a checkpoint.
    pub struct CheckpointId;
}

/// Why the checkpoint was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointReason {
    PreScaffold,
    PreMission,
    PreEdit,
    PreCommand,
    UserManual,
    Periodic,
}

/// Snapshot record for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub relative_path: PathBuf,
    /// 12-hex truncated SHA-256 of the snapshot bytes. Empty when the file
    /// did not exist at checkpoint time.
    pub hash: String,
    pub size: u64,
    pub existed_before: bool,
}

/// Source-control state captured alongside the snapshot, when available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceControlState {
    pub branch: String,
    pub commit: String,
    pub dirty: bool,
}

/// A restorable snapshot of a set of workspace files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub created_at: DateTime<Utc>,
    pub reason: CheckpointReason,
    pub auto_created: bool,
    /// Auto-created checkpoints expire; user-created ones never do.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub files: Vec<FileSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_control: Option<SourceControlState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Checkpoint {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// What a restore would do, computed without touching the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RestorePreview {
    /// Files whose current content differs from the snapshot.
    pub files_to_restore: Vec<PathBuf>,
    /// Files created after the checkpoint that restore will delete.
    pub files_to_delete: Vec<PathBuf>,
    /// Files already identical to the snapshot.
    pub files_unchanged: Vec<PathBuf>,
    pub estimated_ms: u64,
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
