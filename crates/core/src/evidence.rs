// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evidence blob metadata.
//!
//! Evidence is the immutable artifact an event points at: the diff text
//! the user approved, the test output a failure was diagnosed from. Blobs
//! live in the evidence store; events carry only ids.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an evidence blob.
    pub struct EvidenceId;
}

/// What the blob contains, which also picks its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Diff,
    TestOutput,
    ReferenceTokens,
    ContextSelection,
    Diagnosis,
}

impl EvidenceKind {
    /// File extension used when the blob is persisted.
    pub fn extension(&self) -> &'static str {
        match self {
            EvidenceKind::Diff => "patch",
            EvidenceKind::TestOutput => "log",
            EvidenceKind::ReferenceTokens => "json",
            EvidenceKind::ContextSelection => "json",
            EvidenceKind::Diagnosis => "json",
        }
    }
}

/// Metadata for a stored evidence blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: EvidenceId,
    pub kind: EvidenceKind,
    /// 12-hex truncated SHA-256 of the blob bytes.
    pub checksum: String,
    pub size: u64,
}

#[cfg(test)]
#[path = "evidence_tests.rs"]
mod tests;
