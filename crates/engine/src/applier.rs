// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic diff application.
//!
//! The safety-critical commit pipeline, in strict order: re-read and
//! sha-check every target, prepare new content in memory, write sidecar
//! temps, rename into place, clean up. Rename is the commit point. A
//! rename failure mid-batch restores the whole batch from its checkpoint.
//!
//! The `CommitFs` trait abstracts the mutating filesystem operations so
//! tests can inject failures at exact points in the pipeline.

use ordinex_core::{
    check_batch_staleness, Clock, DiffId, DiffProposal, FileAction, StaleFile,
};
use ordinex_patch::{apply as apply_hunks, FileDiff, PatchError};
use ordinex_storage::{CheckpointError, CheckpointStore};
use ordinex_core::CheckpointId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Suffix for sidecar temp files.
const TEMP_SUFFIX: &str = ".ordinex_temp";

/// Errors from the apply pipeline
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("stale context: {} file(s) changed since excerpt selection", .0.len())]
    StaleContext(Vec<StaleFile>),
    #[error("hunk mismatch: {0}")]
    HunkMismatch(PatchError),
    #[error("IO error on {path}: {message}", path = .path.display())]
    Io { path: PathBuf, message: String },
    #[error("commit failed on {path}; rollback {rollback}", path = .path.display())]
    ApplyFailed {
        path: PathBuf,
        /// "succeeded" | "failed: <detail>"
        rollback: String,
    },
    #[error("diff {0} was already applied")]
    DuplicateDiff(DiffId),
    #[error("checkpoint error during rollback: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Mutating filesystem operations used by the commit pipeline.
pub trait CommitFs: Send + Sync {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

impl CommitFs for Box<dyn CommitFs> {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        (**self).write(path, bytes)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        (**self).remove(path)
    }
}

/// Production implementation over std::fs.
#[derive(Clone, Default)]
pub struct RealFs;

impl CommitFs for RealFs {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        io::Write::write_all(&mut file, bytes)?;
        file.sync_all()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        // Atomic replace on POSIX; the platform primitive is the commit point
        std::fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

fn temp_path(target: &Path) -> PathBuf {
    PathBuf::from(format!("{}{TEMP_SUFFIX}", target.display()))
}

/// Applies approved diff proposals to the workspace.
pub struct DiffApplier<F: CommitFs = RealFs> {
    workspace_root: PathBuf,
    fs: F,
    /// Idempotency guard: proposals applied in this mission.
    applied: Mutex<HashSet<DiffId>>,
}

impl DiffApplier<RealFs> {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self::with_fs(workspace_root, RealFs)
    }
}

impl<F: CommitFs> DiffApplier<F> {
    pub fn with_fs(workspace_root: impl Into<PathBuf>, fs: F) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            fs,
            applied: Mutex::new(HashSet::new()),
        }
    }

    /// Re-seed the idempotency guard from replayed `diff_applied` ids
    /// (crash recovery).
    pub fn seed_applied(&self, diff_ids: impl IntoIterator<Item = DiffId>) {
        self.applied.lock().extend(diff_ids);
    }

    pub fn was_applied(&self, diff_id: &DiffId) -> bool {
        self.applied.lock().contains(diff_id)
    }

    /// Apply a proposal. Returns the workspace-relative paths touched.
    ///
    /// On any failure before the commit point the workspace is untouched
    /// and the idempotency guard is released so a retry can re-submit the
    /// same diff id.
    pub fn apply<C: Clock>(
        &self,
        proposal: &DiffProposal,
        files: &[FileDiff],
        checkpoints: &CheckpointStore<C>,
        checkpoint_id: &CheckpointId,
    ) -> Result<Vec<PathBuf>, ApplyError> {
        {
            let mut applied = self.applied.lock();
            if !applied.insert(proposal.diff_id.clone()) {
                return Err(ApplyError::DuplicateDiff(proposal.diff_id.clone()));
            }
        }

        match self.apply_inner(proposal, files, checkpoints, checkpoint_id) {
            Ok(paths) => Ok(paths),
            Err(e) => {
                // Release the guard so an explicit retry is possible
                self.applied.lock().remove(&proposal.diff_id);
                Err(e)
            }
        }
    }

    fn apply_inner<C: Clock>(
        &self,
        proposal: &DiffProposal,
        files: &[FileDiff],
        checkpoints: &CheckpointStore<C>,
        checkpoint_id: &CheckpointId,
    ) -> Result<Vec<PathBuf>, ApplyError> {
        // 1. Immediate-pre-apply staleness check: re-read every target and
        //    compare against the shas recorded at excerpt selection.
        let expected = proposal.expected_shas();
        let mut current: HashMap<PathBuf, Vec<u8>> = HashMap::new();
        for path in expected.keys() {
            let absolute = self.workspace_root.join(path);
            if let Ok(bytes) = std::fs::read(&absolute) {
                current.insert(path.clone(), bytes);
            }
        }
        let stale = check_batch_staleness(&current, &expected);
        if !stale.is_empty() {
            warn!(files = stale.len(), "stale context detected at pre-apply check");
            return Err(ApplyError::StaleContext(stale));
        }

        // 2. Prepare all new content in memory; nothing touches disk yet.
        let mut prepared: Vec<(PathBuf, FileAction, Option<String>)> = Vec::new();
        for file in files {
            let Some(path) = file.path().cloned() else {
                continue;
            };
            let action = file.action();
            match action {
                FileAction::Delete => prepared.push((path, action, None)),
                FileAction::Create | FileAction::Update => {
                    let original = match action {
                        FileAction::Create => String::new(),
                        _ => {
                            let absolute = self.workspace_root.join(&path);
                            std::fs::read_to_string(&absolute).map_err(|e| ApplyError::Io {
                                path: path.clone(),
                                message: e.to_string(),
                            })?
                        }
                    };
                    let new_content =
                        apply_hunks(&original, file).map_err(ApplyError::HunkMismatch)?;
                    prepared.push((path, action, Some(new_content)));
                }
            }
        }

        // 3. Write sidecar temps for every content-bearing target.
        let mut temps: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (path, _, content) in prepared.iter().filter(|(_, _, c)| c.is_some()) {
            let target = self.workspace_root.join(path);
            let temp = temp_path(&target);
            if let Err(e) = self
                .fs
                .write(&temp, content.as_deref().unwrap_or_default().as_bytes())
            {
                for (written, _) in &temps {
                    let _ = self.fs.remove(written);
                }
                let _ = self.fs.remove(&temp);
                return Err(ApplyError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                });
            }
            temps.push((temp, target));
        }

        // 4. Commit: rename temps into place; deletes happen here too.
        for (i, (temp, target)) in temps.iter().enumerate() {
            if let Err(e) = self.fs.rename(temp, target) {
                error!(
                    path = %target.display(),
                    error = %e,
                    "rename failed mid-commit, rolling back from checkpoint"
                );
                // Remove temps not yet committed
                for (remaining, _) in &temps[i..] {
                    let _ = self.fs.remove(remaining);
                }
                let rollback = match checkpoints.restore(checkpoint_id) {
                    Ok(()) => "succeeded".to_string(),
                    Err(restore_err) => format!("failed: {restore_err}"),
                };
                return Err(ApplyError::ApplyFailed {
                    path: target.clone(),
                    rollback,
                });
            }
        }
        for (path, action, _) in &prepared {
            if *action == FileAction::Delete {
                let target = self.workspace_root.join(path);
                if target.exists() {
                    if let Err(e) = self.fs.remove(&target) {
                        let rollback = match checkpoints.restore(checkpoint_id) {
                            Ok(()) => "succeeded".to_string(),
                            Err(restore_err) => format!("failed: {restore_err}"),
                        };
                        return Err(ApplyError::ApplyFailed {
                            path: path.clone(),
                            rollback,
                        });
                    }
                }
            }
        }

        // 5. Cleanup: no orphan temps survive a successful apply.
        for (temp, _) in &temps {
            if temp.exists() {
                let _ = self.fs.remove(temp);
            }
        }

        let paths: Vec<PathBuf> = prepared.into_iter().map(|(p, _, _)| p).collect();
        info!(diff = %proposal.diff_id, files = paths.len(), "diff applied");
        Ok(paths)
    }
}

#[cfg(test)]
#[path = "applier_tests.rs"]
mod tests;
