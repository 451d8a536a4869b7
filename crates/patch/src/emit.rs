// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Render structured diffs back to canonical unified-diff text.

use crate::parser::{FileDiff, HunkLine};
use std::fmt::Write as _;
use std::path::Path;

fn render_side(path: Option<&Path>, prefix: &str) -> String {
    match path {
        Some(p) => format!("{prefix}/{}", p.display()),
        None => "/dev/null".to_string(),
    }
}

/// Emit canonical unified-diff text for a set of file diffs.
///
/// `parse(emit(files))` round-trips the logical diff.
pub fn emit(files: &[FileDiff]) -> String {
    let mut out = String::new();
    for file in files {
        let _ = writeln!(out, "--- {}", render_side(file.old_path.as_deref(), "a"));
        let _ = writeln!(out, "+++ {}", render_side(file.new_path.as_deref(), "b"));
        for hunk in &file.hunks {
            let _ = writeln!(
                out,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            );
            for line in &hunk.lines {
                match line {
                    HunkLine::Context(text) => {
                        let _ = writeln!(out, " {text}");
                    }
                    HunkLine::Added(text) => {
                        let _ = writeln!(out, "+{text}");
                    }
                    HunkLine::Removed(text) => {
                        let _ = writeln!(out, "-{text}");
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "emit_tests.rs"]
mod tests;
