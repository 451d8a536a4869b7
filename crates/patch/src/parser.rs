// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified-diff parser.
//!
//! Accepts canonical `--- a/path` / `+++ b/path` / `@@ -l,c +l,c @@` form
//! with literal `/dev/null` for creates and deletes. `diff --git` and
//! `index` header lines are tolerated and skipped.

use crate::error::PatchError;
use ordinex_core::FileAction;
use std::path::PathBuf;

/// One line within a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Added(String),
    Removed(String),
}

/// A contiguous `@@`-delimited block of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first line in the old file (0 for creates).
    pub old_start: u32,
    pub old_count: u32,
    /// 1-based first line in the new file (0 for deletes).
    pub new_start: u32,
    pub new_count: u32,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    pub fn lines_added(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| matches!(l, HunkLine::Added(_)))
            .count() as u32
    }

    pub fn lines_removed(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| matches!(l, HunkLine::Removed(_)))
            .count() as u32
    }
}

/// A single file's worth of diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// None means `/dev/null` — the file is being created.
    pub old_path: Option<PathBuf>,
    /// None means `/dev/null` — the file is being deleted.
    pub new_path: Option<PathBuf>,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// The workspace path this diff addresses.
    pub fn path(&self) -> Option<&PathBuf> {
        self.new_path.as_ref().or(self.old_path.as_ref())
    }

    pub fn action(&self) -> FileAction {
        match (&self.old_path, &self.new_path) {
            (None, Some(_)) => FileAction::Create,
            (Some(_), None) => FileAction::Delete,
            _ => FileAction::Update,
        }
    }

    pub fn is_rename(&self) -> bool {
        matches!((&self.old_path, &self.new_path), (Some(old), Some(new)) if old != new)
    }

    pub fn lines_added(&self) -> u32 {
        self.hunks.iter().map(Hunk::lines_added).sum()
    }

    pub fn lines_removed(&self) -> u32 {
        self.hunks.iter().map(Hunk::lines_removed).sum()
    }
}

/// Strip the conventional `a/` or `b/` prefix; `/dev/null` becomes None.
fn parse_path(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw == "/dev/null" {
        return None;
    }
    let stripped = raw
        .strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw);
    Some(PathBuf::from(stripped))
}

/// Parse `-l,c` or `-l` into (start, count).
fn parse_range(raw: &str, line: usize) -> Result<(u32, u32), PatchError> {
    let parse = |s: &str| -> Result<u32, PatchError> {
        s.parse().map_err(|_| PatchError::Parse {
            line,
            message: format!("bad hunk range number: {s:?}"),
        })
    };
    match raw.split_once(',') {
        Some((start, count)) => Ok((parse(start)?, parse(count)?)),
        None => Ok((parse(raw)?, 1)),
    }
}

/// Parse a `@@ -l,c +l,c @@` header.
fn parse_hunk_header(text: &str, line: usize) -> Result<(u32, u32, u32, u32), PatchError> {
    let inner = text
        .strip_prefix("@@")
        .and_then(|rest| rest.find("@@").map(|i| &rest[..i]))
        .ok_or_else(|| PatchError::Parse {
            line,
            message: "malformed hunk header".to_string(),
        })?
        .trim();

    let mut parts = inner.split_whitespace();
    let old = parts.next().and_then(|p| p.strip_prefix('-'));
    let new = parts.next().and_then(|p| p.strip_prefix('+'));
    match (old, new) {
        (Some(old), Some(new)) => {
            let (old_start, old_count) = parse_range(old, line)?;
            let (new_start, new_count) = parse_range(new, line)?;
            Ok((old_start, old_count, new_start, new_count))
        }
        _ => Err(PatchError::Parse {
            line,
            message: "hunk header missing ranges".to_string(),
        }),
    }
}

/// Parse unified-diff text into per-file structured diffs.
pub fn parse(text: &str) -> Result<Vec<FileDiff>, PatchError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut pending_old: Option<Option<PathBuf>> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if raw_line.starts_with("--- ") {
            if let Some(file) = current.take() {
                files.push(file);
            }
            pending_old = Some(parse_path(&raw_line[4..]));
            continue;
        }

        if let Some(rest) = raw_line.strip_prefix("+++ ") {
            let old_path = pending_old.take().ok_or_else(|| PatchError::Parse {
                line: line_no,
                message: "'+++' without preceding '---'".to_string(),
            })?;
            let new_path = parse_path(rest);
            if old_path.is_none() && new_path.is_none() {
                return Err(PatchError::Parse {
                    line: line_no,
                    message: "both sides are /dev/null".to_string(),
                });
            }
            current = Some(FileDiff {
                old_path,
                new_path,
                hunks: Vec::new(),
            });
            continue;
        }

        if raw_line.starts_with("@@") {
            let file = current.as_mut().ok_or_else(|| PatchError::Parse {
                line: line_no,
                message: "hunk header outside a file diff".to_string(),
            })?;
            let (old_start, old_count, new_start, new_count) =
                parse_hunk_header(raw_line, line_no)?;
            file.hunks.push(Hunk {
                old_start,
                old_count,
                new_start,
                new_count,
                lines: Vec::new(),
            });
            continue;
        }

        // Headers we tolerate between file sections
        if raw_line.starts_with("diff ")
            || raw_line.starts_with("index ")
            || raw_line.starts_with("new file mode")
            || raw_line.starts_with("deleted file mode")
        {
            continue;
        }

        // "\ No newline at end of file" markers carry no content
        if raw_line.starts_with('\\') {
            continue;
        }

        if let Some(file) = current.as_mut() {
            if let Some(hunk) = file.hunks.last_mut() {
                let hunk_line = match raw_line.chars().next() {
                    Some('+') => HunkLine::Added(raw_line[1..].to_string()),
                    Some('-') => HunkLine::Removed(raw_line[1..].to_string()),
                    Some(' ') => HunkLine::Context(raw_line[1..].to_string()),
                    // An empty line inside a hunk is a context line whose
                    // leading space was trimmed in transit.
                    None => HunkLine::Context(String::new()),
                    Some(_) => {
                        return Err(PatchError::Parse {
                            line: line_no,
                            message: format!("unexpected line in hunk: {raw_line:?}"),
                        })
                    }
                };
                hunk.lines.push(hunk_line);
            }
        }
    }

    if pending_old.is_some() {
        return Err(PatchError::Parse {
            line: text.lines().count(),
            message: "'---' without matching '+++'".to_string(),
        });
    }
    if let Some(file) = current.take() {
        files.push(file);
    }

    // Declared hunk counts must agree with the body
    for file in &files {
        for (i, hunk) in file.hunks.iter().enumerate() {
            let old_lines = hunk
                .lines
                .iter()
                .filter(|l| matches!(l, HunkLine::Context(_) | HunkLine::Removed(_)))
                .count() as u32;
            let new_lines = hunk
                .lines
                .iter()
                .filter(|l| matches!(l, HunkLine::Context(_) | HunkLine::Added(_)))
                .count() as u32;
            if old_lines != hunk.old_count || new_lines != hunk.new_count {
                return Err(PatchError::Parse {
                    line: 0,
                    message: format!(
                        "hunk {} of {} declares -{},{} +{},{} but body has {} old / {} new lines",
                        i + 1,
                        file.path().map(|p| p.display().to_string()).unwrap_or_default(),
                        hunk.old_start,
                        hunk.old_count,
                        hunk.new_start,
                        hunk.new_count,
                        old_lines,
                        new_lines,
                    ),
                });
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
