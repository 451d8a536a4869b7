// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic excerpt selection for the model prompt.
//!
//! Given the same inputs, selection is reproducible: sorts are stable,
//! tie-breaks are lexicographic, and the line budget drops whole ranges
//! rather than splitting them. The recorded `base_sha` is always the sha
//! of the FULL file — it gates the later staleness check.

use crate::config::SelectorConfig;
use crate::error::EngineError;
use crate::scope::ScopeGuard;
use ordinex_adapters::RankedPath;
use ordinex_core::base_sha;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Common words dropped from step text before keyword matching.
const STOPWORDS: [&str; 24] = [
    "the", "and", "for", "with", "from", "into", "that", "this", "then", "when", "where", "what",
    "will", "should", "must", "have", "has", "are", "was", "were", "can", "could", "its", "all",
];

/// Inputs to file selection, in priority order.
#[derive(Debug, Clone, Default)]
pub struct SelectionInput {
    /// Retrieval results (highest priority).
    pub retrieval: Vec<RankedPath>,
    /// Files open in the editor.
    pub open_editors: Vec<PathBuf>,
    /// Fallback anchors (e.g. the plan's likely files).
    pub anchors: Vec<PathBuf>,
}

/// One selected excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExcerpt {
    pub path: PathBuf,
    /// Excerpt text with 1-based line numbers prefixed.
    pub content_with_line_numbers: String,
    /// Sha of the full file content, not the excerpt.
    pub base_sha: String,
    pub line_start: usize,
    pub line_end: usize,
    pub is_full_file: bool,
}

/// Tokenise step text on identifier boundaries, keeping ≥3-char
/// non-stopwords, lowercased, order-preserving, deduplicated.
pub fn extract_keywords(step_text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for token in step_text.split(|c: char| !c.is_alphanumeric() && c != '_') {
        let token = token.to_lowercase();
        if token.len() < 3 || STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if seen.insert(token.clone()) {
            keywords.push(token);
        }
    }
    keywords
}

/// Inclusive 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Range {
    start: usize,
    end: usize,
}

impl Range {
    fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Merge overlapping or adjacent ranges, preserving line order.
fn merge_ranges(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by_key(|r| (r.start, r.end));
    let mut merged: Vec<Range> = Vec::new();
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end + 1 => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

pub struct ExcerptSelector {
    config: SelectorConfig,
}

impl ExcerptSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Pick the files to show the model, in priority order.
    ///
    /// (a) retrieval results by descending score then ascending path,
    /// (b) open editors, (c) fallback anchors; stop at `max_files`.
    /// Paths under the scope guard's denied roots never make the list.
    fn select_files(&self, input: &SelectionInput, guard: &ScopeGuard) -> Vec<PathBuf> {
        let mut ranked = input.retrieval.clone();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let candidates = ranked
            .into_iter()
            .map(|r| r.path)
            .chain(input.open_editors.iter().cloned())
            .chain(input.anchors.iter().cloned());
        for path in candidates {
            if files.len() >= self.config.max_files {
                break;
            }
            if guard.is_denied(&path) {
                continue;
            }
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
        files
    }

    /// Build excerpts for a step within the line budget.
    pub fn select(
        &self,
        workspace_root: &Path,
        input: &SelectionInput,
        step_text: &str,
        guard: &ScopeGuard,
    ) -> Result<Vec<FileExcerpt>, EngineError> {
        let keywords = extract_keywords(step_text);
        let mut remaining_budget = self.config.max_total_lines;
        let mut excerpts = Vec::new();

        for path in self.select_files(input, guard) {
            let absolute = workspace_root.join(&path);
            if !absolute.is_file() {
                continue;
            }
            let content = std::fs::read(&absolute)?;
            let sha = base_sha(&content);
            let text = String::from_utf8_lossy(&content).to_string();
            let lines: Vec<&str> = text.lines().collect();

            if lines.len() <= self.config.full_file_threshold {
                // Whole file fits the threshold; include it if the budget
                // still has room (a full file is one undroppable range).
                if lines.len() > remaining_budget {
                    continue;
                }
                remaining_budget -= lines.len();
                excerpts.push(FileExcerpt {
                    path,
                    content_with_line_numbers: number_lines(&lines, 1),
                    base_sha: sha,
                    line_start: 1,
                    line_end: lines.len().max(1),
                    is_full_file: true,
                });
                continue;
            }

            let ranges = self.excerpt_ranges(&lines, &keywords);
            let mut kept = Vec::new();
            for range in ranges {
                // Never split a range; drop what does not fit.
                if range.len() > remaining_budget {
                    continue;
                }
                remaining_budget -= range.len();
                kept.push(range);
            }
            if kept.is_empty() {
                continue;
            }

            let mut rendered = String::new();
            for (i, range) in kept.iter().enumerate() {
                if i > 0 {
                    rendered.push_str("...\n");
                }
                rendered.push_str(&number_lines(
                    &lines[range.start - 1..range.end],
                    range.start,
                ));
            }
            excerpts.push(FileExcerpt {
                path,
                content_with_line_numbers: rendered,
                base_sha: sha,
                line_start: kept[0].start,
                line_end: kept[kept.len() - 1].end,
                is_full_file: false,
            });
        }

        Ok(excerpts)
    }

    /// Union of anchored ranges for a file too large to send whole.
    fn excerpt_ranges(&self, lines: &[&str], keywords: &[String]) -> Vec<Range> {
        let total = lines.len();
        let clamp = |n: usize| n.min(total).max(1);
        let mut ranges = Vec::new();

        // Leading import section, up to the cap
        let mut import_end = 0;
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("import ")
                || trimmed.starts_with("use ")
                || trimmed.starts_with("from ")
                || trimmed.starts_with("require(")
                || (i < 3 && trimmed.is_empty())
            {
                import_end = i + 1;
                if import_end >= self.config.import_cap_lines {
                    break;
                }
            } else if import_end > 0 {
                break;
            } else if i > 3 {
                break;
            }
        }
        if import_end > 0 {
            ranges.push(Range {
                start: 1,
                end: clamp(import_end),
            });
        }

        // Anchor-keyword lines (e.g. every `export`) with context
        let n = self.config.anchor_context_lines;
        for (i, line) in lines.iter().enumerate() {
            if self
                .config
                .anchor_keywords
                .iter()
                .any(|k| line.contains(k.as_str()))
            {
                ranges.push(Range {
                    start: clamp(i.saturating_sub(n) + 1),
                    end: clamp(i + 1 + n),
                });
            }
        }

        // Step-keyword lines with context
        let m = self.config.keyword_context_lines;
        for (i, line) in lines.iter().enumerate() {
            let lowered = line.to_lowercase();
            if keywords.iter().any(|k| lowered.contains(k.as_str())) {
                ranges.push(Range {
                    start: clamp(i.saturating_sub(m) + 1),
                    end: clamp(i + 1 + m),
                });
            }
        }

        // Small files keep their head
        if total < 100 {
            ranges.push(Range {
                start: 1,
                end: clamp(50),
            });
        }

        merge_ranges(ranges)
    }
}

fn number_lines(lines: &[&str], start: usize) -> String {
    let mut out = String::new();
    for (offset, line) in lines.iter().enumerate() {
        let _ = writeln!(out, "{:>5} | {line}", start + offset);
    }
    out
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
