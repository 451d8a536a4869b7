// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the diff pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors from parsing, validating, or applying unified diffs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("hunk {hunk} does not apply to {path}: {message}")]
    HunkMismatch {
        path: PathBuf,
        hunk: usize,
        message: String,
    },

    #[error("file creation not allowed: {0}")]
    CreateNotAllowed(PathBuf),

    #[error("file deletion not allowed: {0}")]
    DeleteNotAllowed(PathBuf),

    #[error("file rename not allowed: {old} -> {new}", old = .old.display(), new = .new.display())]
    RenameNotAllowed { old: PathBuf, new: PathBuf },

    #[error("diff touches {count} files, max is {max}")]
    TooManyFiles { count: usize, max: usize },

    #[error("diff changes {count} lines, max is {max}")]
    TooManyLines { count: usize, max: usize },

    #[error("declared base sha for {path} is {declared}, expected {expected}", path = .path.display())]
    ShaMismatch {
        path: PathBuf,
        declared: String,
        expected: String,
    },

    #[error("no base sha declared for touched file {0}")]
    MissingSha(PathBuf),

    #[error("diff touches {0} which is not in the declared touched-file list")]
    UndeclaredFile(PathBuf),
}
