// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diff proposal types.
//!
//! A proposal is what the model offers and the user reviews. The unified
//! diff text is the evidence form; the touched-file records carry the
//! staleness-gating shas.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a diff proposal.
    pub struct DiffId;
}

/// What the proposal does to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Create,
    Update,
    Delete,
}

/// One file touched by a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchedFile {
    pub path: PathBuf,
    pub action: FileAction,
    /// 12-hex truncated SHA-256 of the file content as sent to the model.
    /// Absent for creates (there was no prior content).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_sha: Option<String>,
    /// Full replacement content, when the model supplies one instead of
    /// (or in addition to) hunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    #[serde(default)]
    pub lines_added: u32,
    #[serde(default)]
    pub lines_removed: u32,
}

/// A reviewable set of file changes proposed in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffProposal {
    pub diff_id: DiffId,
    pub touched_files: Vec<TouchedFile>,
    /// Canonical unified-diff rendering, persisted as evidence.
    pub unified_diff: String,
}

impl DiffProposal {
    /// Expected sha per updated/deleted path, for the pre-apply staleness gate.
    pub fn expected_shas(&self) -> HashMap<PathBuf, String> {
        self.touched_files
            .iter()
            .filter_map(|f| f.base_sha.as_ref().map(|s| (f.path.clone(), s.clone())))
            .collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.touched_files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn total_changed_lines(&self) -> u32 {
        self.touched_files
            .iter()
            .map(|f| f.lines_added + f.lines_removed)
            .sum()
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
