// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace checkpoints: restorable snapshots of a set of files.
//!
//! Layout under `<workspace>/.ordinex/checkpoints/`:
//!
//! ```text
//! index.json                      registry of all checkpoints
//! <id>/metadata.json              the Checkpoint record
//! <id>/files/<relative_path>      snapshot bytes
//! <id>/source_control_state.json  branch/commit/dirty, when captured
//! ```
//!
//! The index is replaced atomically (tmp + rename) on every mutation.
//! Restore is all-or-nothing: sidecar temps are staged for every file
//! before the first rename, and any failure surfaces per-file detail.

use ordinex_core::{
    base_sha, Checkpoint, CheckpointId, CheckpointReason, Clock, FileSnapshot, RestorePreview,
    SourceControlState, SystemClock,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Rough per-file restore cost for the preview's time estimate.
const ESTIMATED_MS_PER_FILE: u64 = 5;

/// Errors from checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("checkpoint not found: {0}")]
    NotFound(CheckpointId),
    #[error("snapshot bytes missing for {path} in checkpoint {id}", path = .path.display())]
    SnapshotMissing { id: CheckpointId, path: PathBuf },
    #[error("restore failed for {} file(s)", .failures.len())]
    RestoreFailed { failures: Vec<RestoreFailure> },
}

/// Per-file detail for a failed restore, enough for manual recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Retention policy for the checkpoint registry.
#[derive(Debug, Clone)]
pub struct CheckpointPolicy {
    /// Registry cap; oldest auto-created entries are evicted past it.
    pub max_entries: usize,
    /// TTL for auto-created edit/scaffold/command checkpoints.
    pub edit_ttl_hours: i64,
    /// TTL for auto-created mission checkpoints.
    pub mission_ttl_hours: i64,
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            max_entries: 50,
            edit_ttl_hours: 24,
            mission_ttl_hours: 48,
        }
    }
}

/// Options for creating a checkpoint.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub reason: CheckpointReason,
    /// Workspace-relative paths to snapshot.
    pub files: Vec<PathBuf>,
    pub auto_created: bool,
    pub label: Option<String>,
    /// Skip the `git` shell-out (tests, non-repo workspaces).
    pub capture_source_control: bool,
}

impl CreateOptions {
    pub fn auto(reason: CheckpointReason, files: Vec<PathBuf>) -> Self {
        Self {
            reason,
            files,
            auto_created: true,
            label: None,
            capture_source_control: true,
        }
    }

    pub fn manual(files: Vec<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            reason: CheckpointReason::UserManual,
            files,
            auto_created: false,
            label: Some(label.into()),
            capture_source_control: true,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointIndex {
    checkpoints: Vec<Checkpoint>,
}

/// Store managing checkpoint snapshots for one workspace.
pub struct CheckpointStore<C: Clock = SystemClock> {
    workspace_root: PathBuf,
    dir: PathBuf,
    policy: CheckpointPolicy,
    clock: C,
    index: CheckpointIndex,
}

impl CheckpointStore<SystemClock> {
    pub fn open(
        workspace_root: impl Into<PathBuf>,
        dir: impl Into<PathBuf>,
        policy: CheckpointPolicy,
    ) -> Result<Self, CheckpointError> {
        Self::open_with_clock(workspace_root, dir, policy, SystemClock)
    }
}

impl<C: Clock> CheckpointStore<C> {
    pub fn open_with_clock(
        workspace_root: impl Into<PathBuf>,
        dir: impl Into<PathBuf>,
        policy: CheckpointPolicy,
        clock: C,
    ) -> Result<Self, CheckpointError> {
        let dir: PathBuf = dir.into();
        fs::create_dir_all(&dir)?;

        let index_path = dir.join("index.json");
        let index = if index_path.exists() {
            serde_json::from_slice(&fs::read(&index_path)?)?
        } else {
            CheckpointIndex::default()
        };

        Ok(Self {
            workspace_root: workspace_root.into(),
            dir,
            policy,
            clock,
            index,
        })
    }

    pub fn list(&self) -> &[Checkpoint] {
        &self.index.checkpoints
    }

    pub fn get(&self, id: &CheckpointId) -> Option<&Checkpoint> {
        self.index.checkpoints.iter().find(|c| &c.id == id)
    }

    fn checkpoint_dir(&self, id: &CheckpointId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    fn snapshot_path(&self, id: &CheckpointId, relative: &Path) -> PathBuf {
        self.checkpoint_dir(id).join("files").join(relative)
    }

    fn ttl_for(&self, reason: CheckpointReason) -> Duration {
        match reason {
            CheckpointReason::PreMission => Duration::hours(self.policy.mission_ttl_hours),
            _ => Duration::hours(self.policy.edit_ttl_hours),
        }
    }

    /// Snapshot the listed files and register the checkpoint.
    pub fn create(
        &mut self,
        id: CheckpointId,
        options: CreateOptions,
    ) -> Result<Checkpoint, CheckpointError> {
        let now: DateTime<Utc> = self.clock.utc();
        let mut snapshots = Vec::with_capacity(options.files.len());

        for relative in &options.files {
            let source = self.workspace_root.join(relative);
            if source.exists() {
                let bytes = fs::read(&source)?;
                let dest = self.snapshot_path(&id, relative);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&dest, &bytes)?;
                snapshots.push(FileSnapshot {
                    relative_path: relative.clone(),
                    hash: base_sha(&bytes),
                    size: bytes.len() as u64,
                    existed_before: true,
                });
            } else {
                snapshots.push(FileSnapshot {
                    relative_path: relative.clone(),
                    hash: String::new(),
                    size: 0,
                    existed_before: false,
                });
            }
        }

        let source_control = if options.capture_source_control {
            capture_source_control(&self.workspace_root)
        } else {
            None
        };

        let checkpoint = Checkpoint {
            id: id.clone(),
            created_at: now,
            reason: options.reason,
            auto_created: options.auto_created,
            expires_at: options
                .auto_created
                .then(|| now + self.ttl_for(options.reason)),
            files: snapshots,
            source_control: source_control.clone(),
            label: options.label,
        };

        let meta_path = self.checkpoint_dir(&id).join("metadata.json");
        write_json_atomic(&meta_path, &checkpoint)?;
        if let Some(state) = &source_control {
            let sc_path = self.checkpoint_dir(&id).join("source_control_state.json");
            write_json_atomic(&sc_path, state)?;
        }

        self.index.checkpoints.push(checkpoint.clone());
        self.save_index()?;

        info!(
            id = %checkpoint.id,
            reason = ?checkpoint.reason,
            files = checkpoint.files.len(),
            "checkpoint created"
        );
        Ok(checkpoint)
    }

    /// Compute what a restore would do, without modifying the workspace.
    pub fn preview_restore(&self, id: &CheckpointId) -> Result<RestorePreview, CheckpointError> {
        let checkpoint = self
            .get(id)
            .ok_or_else(|| CheckpointError::NotFound(id.clone()))?;

        let mut preview = RestorePreview::default();
        for snapshot in &checkpoint.files {
            let current = self.workspace_root.join(&snapshot.relative_path);
            if snapshot.existed_before {
                let matches = current
                    .exists()
                    .then(|| fs::read(&current).map(|b| base_sha(&b) == snapshot.hash))
                    .transpose()?
                    .unwrap_or(false);
                if matches {
                    preview.files_unchanged.push(snapshot.relative_path.clone());
                } else {
                    preview.files_to_restore.push(snapshot.relative_path.clone());
                }
            } else if current.exists() {
                preview.files_to_delete.push(snapshot.relative_path.clone());
            }
        }
        preview.estimated_ms = (preview.files_to_restore.len() + preview.files_to_delete.len())
            as u64
            * ESTIMATED_MS_PER_FILE;
        Ok(preview)
    }

    /// Restore the workspace to the checkpoint's content.
    ///
    /// Files that existed at checkpoint time get their snapshot bytes
    /// back; files that did not exist are deleted. Temps are staged for
    /// every write before the first rename.
    pub fn restore(&self, id: &CheckpointId) -> Result<(), CheckpointError> {
        let checkpoint = self
            .get(id)
            .ok_or_else(|| CheckpointError::NotFound(id.clone()))?;

        // Stage phase: every snapshot readable and every temp written,
        // or nothing in the workspace changes.
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
        for snapshot in checkpoint.files.iter().filter(|s| s.existed_before) {
            let source = self.snapshot_path(id, &snapshot.relative_path);
            if !source.exists() {
                remove_temps(&staged);
                return Err(CheckpointError::SnapshotMissing {
                    id: id.clone(),
                    path: snapshot.relative_path.clone(),
                });
            }
            let target = self.workspace_root.join(&snapshot.relative_path);
            let temp = temp_path(&target);
            let stage = (|| -> std::io::Result<()> {
                let bytes = fs::read(&source)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut file = fs::File::create(&temp)?;
                file.write_all(&bytes)?;
                file.sync_all()?;
                Ok(())
            })();
            if let Err(e) = stage {
                remove_temps(&staged);
                let _ = fs::remove_file(&temp);
                return Err(e.into());
            }
            staged.push((temp, target));
        }

        // Commit phase: renames and deletions, collecting per-file detail.
        let mut failures = Vec::new();
        for (temp, target) in &staged {
            if let Err(e) = fs::rename(temp, target) {
                failures.push(RestoreFailure {
                    path: target.clone(),
                    error: e.to_string(),
                });
                let _ = fs::remove_file(temp);
            }
        }
        for snapshot in checkpoint.files.iter().filter(|s| !s.existed_before) {
            let target = self.workspace_root.join(&snapshot.relative_path);
            if target.exists() {
                if let Err(e) = fs::remove_file(&target) {
                    failures.push(RestoreFailure {
                        path: target,
                        error: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            info!(id = %id, files = checkpoint.files.len(), "checkpoint restored");
            Ok(())
        } else {
            warn!(id = %id, failures = failures.len(), "checkpoint restore incomplete");
            Err(CheckpointError::RestoreFailed { failures })
        }
    }

    /// Drop expired auto-created checkpoints, then enforce the registry
    /// cap by evicting oldest auto-created entries. User-created entries
    /// are never evicted.
    pub fn prune(&mut self) -> Result<Vec<CheckpointId>, CheckpointError> {
        let now = self.clock.utc();
        let mut removed = Vec::new();

        let expired: Vec<CheckpointId> = self
            .index
            .checkpoints
            .iter()
            .filter(|c| c.auto_created && c.is_expired(now))
            .map(|c| c.id.clone())
            .collect();
        for id in expired {
            self.remove_entry(&id)?;
            removed.push(id);
        }

        while self.index.checkpoints.len() > self.policy.max_entries {
            let oldest_auto = self
                .index
                .checkpoints
                .iter()
                .filter(|c| c.auto_created)
                .min_by_key(|c| c.created_at)
                .map(|c| c.id.clone());
            match oldest_auto {
                Some(id) => {
                    self.remove_entry(&id)?;
                    removed.push(id);
                }
                None => break,
            }
        }

        if !removed.is_empty() {
            self.save_index()?;
        }
        Ok(removed)
    }

    fn remove_entry(&mut self, id: &CheckpointId) -> Result<(), CheckpointError> {
        self.index.checkpoints.retain(|c| &c.id != id);
        let dir = self.checkpoint_dir(id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    fn save_index(&self) -> Result<(), CheckpointError> {
        write_json_atomic(&self.dir.join("index.json"), &self.index)
    }
}

fn temp_path(target: &Path) -> PathBuf {
    PathBuf::from(format!("{}.ordinex_restore", target.display()))
}

fn remove_temps(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
}

/// Save JSON atomically (write to .tmp, fsync, then rename).
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CheckpointError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&serde_json::to_vec_pretty(value)?)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Best-effort capture of the workspace's git state.
fn capture_source_control(root: &Path) -> Option<SourceControlState> {
    let git = |args: &[&str]| -> Option<String> {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    };

    let branch = git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    let commit = git(&["rev-parse", "HEAD"])?;
    let dirty = git(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty());
    Some(SourceControlState {
        branch,
        commit,
        dirty,
    })
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
