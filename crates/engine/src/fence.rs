// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Create-path fence: glob policy for new-file creation.
//!
//! Two layers, denylist first. A path matching both layers is rejected —
//! deny always wins. Paths off the allowlist are not hard-rejected; they
//! surface `requires_scope_expansion` so the mission can ask.

use crate::config::FenceConfig;
use crate::error::EngineError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use parking_lot::Mutex;
use std::path::Path;

/// Outcome of a fence check, naming the rule that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceDecision {
    pub allowed: bool,
    /// Glob or limit that decided the outcome.
    pub matched_rule: Option<String>,
    /// True when the only problem is an allowlist miss.
    pub requires_scope_expansion: bool,
}

impl FenceDecision {
    fn allowed(rule: &str) -> Self {
        Self {
            allowed: true,
            matched_rule: Some(rule.to_string()),
            requires_scope_expansion: false,
        }
    }

    fn denied(rule: &str) -> Self {
        Self {
            allowed: false,
            matched_rule: Some(rule.to_string()),
            requires_scope_expansion: false,
        }
    }
}

struct CompiledGlobs {
    set: GlobSet,
    patterns: Vec<String>,
}

fn compile(patterns: &[String]) -> Result<CompiledGlobs, EngineError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| EngineError::Glob(e.to_string()))?;
        builder.add(glob);
    }
    Ok(CompiledGlobs {
        set: builder
            .build()
            .map_err(|e| EngineError::Glob(e.to_string()))?,
        patterns: patterns.to_vec(),
    })
}

impl CompiledGlobs {
    /// First pattern matching the path, for decision reporting.
    fn first_match(&self, path: &Path) -> Option<&str> {
        self.set
            .matches(path)
            .first()
            .map(|&i| self.patterns[i].as_str())
    }
}

/// Glob-based allow/deny policy for new-file creation.
pub struct CreatePathFence {
    deny: CompiledGlobs,
    allow: CompiledGlobs,
    /// Runtime allowlist extensions from approved scope expansions.
    expanded: Mutex<Option<CompiledGlobs>>,
    max_new_file_size_lines: usize,
}

impl CreatePathFence {
    pub fn new(config: &FenceConfig) -> Result<Self, EngineError> {
        Ok(Self {
            deny: compile(&config.deny)?,
            allow: compile(&config.allow)?,
            expanded: Mutex::new(None),
            max_new_file_size_lines: config.max_new_file_size_lines,
        })
    }

    /// Check whether a new file may be created at `path`.
    pub fn check(&self, path: &Path, line_count: usize) -> FenceDecision {
        // Layer 1: security roots. Matches here hard-reject, even when an
        // allow glob also matches.
        if let Some(rule) = self.deny.first_match(path) {
            return FenceDecision::denied(rule);
        }

        if line_count > self.max_new_file_size_lines {
            return FenceDecision::denied(&format!(
                "max_new_file_size_lines={}",
                self.max_new_file_size_lines
            ));
        }

        // Layer 2: source roots.
        if let Some(rule) = self.allow.first_match(path) {
            return FenceDecision::allowed(rule);
        }
        if let Some(expanded) = self.expanded.lock().as_ref() {
            if let Some(rule) = expanded.first_match(path) {
                return FenceDecision::allowed(rule);
            }
        }

        FenceDecision {
            allowed: false,
            matched_rule: None,
            requires_scope_expansion: true,
        }
    }

    /// Widen the allowlist for this mission (after an approved
    /// `scope_expansion`).
    pub fn expand_allowlist(&self, patterns: &[String]) -> Result<(), EngineError> {
        let mut expanded = self.expanded.lock();
        let mut all = expanded
            .as_ref()
            .map(|c| c.patterns.clone())
            .unwrap_or_default();
        all.extend(patterns.iter().cloned());
        *expanded = Some(compile(&all)?);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fence_tests.rs"]
mod tests;
