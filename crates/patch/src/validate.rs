// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy validation for parsed diffs.

use crate::error::PatchError;
use crate::parser::FileDiff;
use ordinex_core::{FileAction, TouchedFile};
use std::collections::HashMap;
use std::path::PathBuf;

/// What a diff is allowed to do.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub allow_creates: bool,
    pub allow_deletes: bool,
    pub allow_renames: bool,
    pub max_files: usize,
    pub max_changed_lines: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            allow_creates: false,
            allow_deletes: false,
            allow_renames: false,
            max_files: 10,
            max_changed_lines: 1000,
        }
    }
}

/// Validate a parsed diff against the policy.
pub fn validate(files: &[FileDiff], policy: &ValidationPolicy) -> Result<(), PatchError> {
    if files.len() > policy.max_files {
        return Err(PatchError::TooManyFiles {
            count: files.len(),
            max: policy.max_files,
        });
    }

    let mut changed_lines = 0usize;
    for file in files {
        let path = file.path().cloned().unwrap_or_default();
        match file.action() {
            FileAction::Create if !policy.allow_creates => {
                return Err(PatchError::CreateNotAllowed(path))
            }
            FileAction::Delete if !policy.allow_deletes => {
                return Err(PatchError::DeleteNotAllowed(path))
            }
            _ => {}
        }
        if file.is_rename() && !policy.allow_renames {
            return Err(PatchError::RenameNotAllowed {
                old: file.old_path.clone().unwrap_or_default(),
                new: file.new_path.clone().unwrap_or_default(),
            });
        }
        changed_lines += (file.lines_added() + file.lines_removed()) as usize;
    }

    if changed_lines > policy.max_changed_lines {
        return Err(PatchError::TooManyLines {
            count: changed_lines,
            max: policy.max_changed_lines,
        });
    }

    Ok(())
}

/// Check the model's declared shas against the shas of the context we sent.
///
/// Every parsed file must appear in the touched list; every touched update
/// must declare the sha the excerpt selector recorded. This is the cheap
/// precondition gate — the applier re-reads the workspace for the
/// authoritative check at commit time.
pub fn verify_declared_shas(
    files: &[FileDiff],
    touched: &[TouchedFile],
    expected: &HashMap<PathBuf, String>,
) -> Result<(), PatchError> {
    let declared: HashMap<&PathBuf, &TouchedFile> =
        touched.iter().map(|t| (&t.path, t)).collect();

    for file in files {
        let Some(path) = file.path() else { continue };
        let Some(entry) = declared.get(path) else {
            return Err(PatchError::UndeclaredFile(path.clone()));
        };
        if file.action() == FileAction::Create {
            continue;
        }
        let Some(declared_sha) = entry.base_sha.as_deref() else {
            return Err(PatchError::MissingSha(path.clone()));
        };
        if let Some(expected_sha) = expected.get(path) {
            if !declared_sha.eq_ignore_ascii_case(expected_sha) {
                return Err(PatchError::ShaMismatch {
                    path: path.clone(),
                    declared: declared_sha.to_string(),
                    expected: expected_sha.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
