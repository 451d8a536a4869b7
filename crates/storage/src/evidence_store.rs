// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable evidence blobs.
//!
//! Every event with an external observable effect references at least one
//! evidence blob: the diff text that was approved, the test output a
//! failure was diagnosed from, the context-selection manifest. Blobs are
//! written once, checksummed, and never mutated.

use ordinex_core::{base_sha, Evidence, EvidenceId, EvidenceKind};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from evidence operations
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("evidence {0} already exists")]
    AlreadyExists(EvidenceId),
    #[error("evidence {0} not found")]
    NotFound(EvidenceId),
}

/// File-backed store under `<workspace>/.ordinex/evidence/`.
pub struct EvidenceStore {
    dir: PathBuf,
}

impl EvidenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn blob_path(&self, id: &EvidenceId, kind: EvidenceKind) -> PathBuf {
        self.dir.join(format!("{id}.{}", kind.extension()))
    }

    /// Locate an existing blob regardless of kind extension.
    fn find_path(&self, id: &EvidenceId) -> Option<PathBuf> {
        const EXTENSIONS: [&str; 3] = ["json", "patch", "log"];
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{id}.{ext}")))
            .find(|p| p.exists())
    }

    /// Write a blob once. Immutability is enforced: re-writing an existing
    /// id is an error, not an overwrite.
    pub fn write(
        &self,
        id: &EvidenceId,
        kind: EvidenceKind,
        bytes: &[u8],
    ) -> Result<Evidence, EvidenceError> {
        if self.find_path(id).is_some() {
            return Err(EvidenceError::AlreadyExists(id.clone()));
        }
        fs::create_dir_all(&self.dir)?;

        let final_path = self.blob_path(id, kind);
        let tmp_path = final_path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;

        Ok(Evidence {
            id: id.clone(),
            kind,
            checksum: base_sha(bytes),
            size: bytes.len() as u64,
        })
    }

    pub fn read(&self, id: &EvidenceId) -> Result<Vec<u8>, EvidenceError> {
        let path = self
            .find_path(id)
            .ok_or_else(|| EvidenceError::NotFound(id.clone()))?;
        Ok(fs::read(path)?)
    }

    /// Re-read the blob and compare its checksum against the metadata.
    pub fn verify(&self, evidence: &Evidence) -> Result<bool, EvidenceError> {
        let bytes = self.read(&evidence.id)?;
        Ok(base_sha(&bytes) == evidence.checksum)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
#[path = "evidence_store_tests.rs"]
mod tests;
