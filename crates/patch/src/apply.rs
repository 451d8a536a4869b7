// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory hunk application.

use crate::error::PatchError;
use crate::parser::{FileDiff, HunkLine};
use std::path::PathBuf;

fn diff_path(diff: &FileDiff) -> PathBuf {
    diff.path().cloned().unwrap_or_default()
}

/// Apply a file diff to the original content, producing the new content.
///
/// Hunks apply sequentially. Context and removed lines must match the
/// original exactly; any disagreement is a structured `HunkMismatch`
/// naming the file and hunk.
pub fn apply(original: &str, diff: &FileDiff) -> Result<String, PatchError> {
    // Creates replace nothing; the new content is the added lines.
    if diff.old_path.is_none() {
        let mut out = String::new();
        for hunk in &diff.hunks {
            for line in &hunk.lines {
                match line {
                    HunkLine::Added(text) => {
                        out.push_str(text);
                        out.push('\n');
                    }
                    HunkLine::Context(_) | HunkLine::Removed(_) => {
                        return Err(PatchError::HunkMismatch {
                            path: diff_path(diff),
                            hunk: 1,
                            message: "create diff carries non-added lines".to_string(),
                        })
                    }
                }
            }
        }
        return Ok(out);
    }

    // Deletes produce empty content; the caller removes the file.
    if diff.new_path.is_none() {
        return Ok(String::new());
    }

    let had_trailing_newline = original.ends_with('\n') || original.is_empty();
    let old_lines: Vec<&str> = original.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(old_lines.len());
    // 0-based index of the next original line not yet consumed
    let mut cursor: usize = 0;

    for (i, hunk) in diff.hunks.iter().enumerate() {
        let hunk_no = i + 1;
        let start = (hunk.old_start.max(1) - 1) as usize;

        if start < cursor {
            return Err(PatchError::HunkMismatch {
                path: diff_path(diff),
                hunk: hunk_no,
                message: "hunks overlap or are out of order".to_string(),
            });
        }
        if start > old_lines.len() {
            return Err(PatchError::HunkMismatch {
                path: diff_path(diff),
                hunk: hunk_no,
                message: format!(
                    "hunk starts at line {} but file has {} lines",
                    hunk.old_start,
                    old_lines.len()
                ),
            });
        }

        // Copy untouched lines up to the hunk start
        out.extend(old_lines[cursor..start].iter().map(|l| l.to_string()));
        cursor = start;

        for line in &hunk.lines {
            match line {
                HunkLine::Context(expected) => {
                    match old_lines.get(cursor) {
                        Some(actual) if *actual == expected.as_str() => {
                            out.push(expected.clone());
                            cursor += 1;
                        }
                        actual => {
                            return Err(PatchError::HunkMismatch {
                                path: diff_path(diff),
                                hunk: hunk_no,
                                message: format!(
                                    "context line {} expected {:?}, found {:?}",
                                    cursor + 1,
                                    expected,
                                    actual.copied().unwrap_or("<eof>"),
                                ),
                            })
                        }
                    }
                }
                HunkLine::Removed(expected) => match old_lines.get(cursor) {
                    Some(actual) if *actual == expected.as_str() => {
                        cursor += 1;
                    }
                    actual => {
                        return Err(PatchError::HunkMismatch {
                            path: diff_path(diff),
                            hunk: hunk_no,
                            message: format!(
                                "removed line {} expected {:?}, found {:?}",
                                cursor + 1,
                                expected,
                                actual.copied().unwrap_or("<eof>"),
                            ),
                        })
                    }
                },
                HunkLine::Added(text) => {
                    out.push(text.clone());
                }
            }
        }
    }

    // Copy the remainder of the file
    out.extend(old_lines[cursor..].iter().map(|l| l.to_string()));

    let mut new_content = out.join("\n");
    if had_trailing_newline && !new_content.is_empty() {
        new_content.push('\n');
    }
    Ok(new_content)
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
