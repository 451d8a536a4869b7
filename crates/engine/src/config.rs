// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration, loaded from `<workspace>/.ordinex/config.toml`.
//!
//! Every section has a default, so a missing or partial file never blocks
//! execution. The step-classifier keyword lists live here because the
//! mapping is policy, not ground truth.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    /// Repair loop iterations before the mission pauses.
    pub repair_max_iterations: u32,
    /// Tool calls across one autonomy run.
    pub max_tool_calls: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            repair_max_iterations: 3,
            max_tool_calls: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub retrieval_secs: u64,
    pub diff_generation_secs: u64,
    pub test_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            retrieval_secs: 60,
            diff_generation_secs: 120,
            test_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub max_files: usize,
    pub max_total_lines: usize,
    /// Files at or under this many lines are included whole.
    pub full_file_threshold: usize,
    /// Context radius around anchor-keyword lines.
    pub anchor_context_lines: usize,
    /// Context radius around step-keyword lines.
    pub keyword_context_lines: usize,
    /// Longest import section included from the top of a file.
    pub import_cap_lines: usize,
    /// Lines whose presence anchors an excerpt range.
    pub anchor_keywords: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_total_lines: 600,
            full_file_threshold: 150,
            anchor_context_lines: 3,
            keyword_context_lines: 5,
            import_cap_lines: 30,
            anchor_keywords: vec!["export".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditToolConfig {
    /// Above this many files, a truncated call splits before retrying.
    pub max_files_before_split: usize,
    pub max_attempts_per_file: usize,
    pub max_total_chunks: usize,
    pub max_tokens: u32,
    pub max_files: usize,
    pub max_changed_lines: usize,
}

impl Default for EditToolConfig {
    fn default() -> Self {
        Self {
            max_files_before_split: 3,
            max_attempts_per_file: 2,
            max_total_chunks: 8,
            max_tokens: 8192,
            max_files: 10,
            max_changed_lines: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FenceConfig {
    /// Security roots; a match here hard-rejects, allowlist notwithstanding.
    pub deny: Vec<String>,
    /// Source roots where new files may be created.
    pub allow: Vec<String>,
    pub max_new_file_size_lines: usize,
}

impl Default for FenceConfig {
    fn default() -> Self {
        Self {
            deny: [
                "node_modules/**",
                "dist/**",
                "build/**",
                "out/**",
                ".next/**",
                "coverage/**",
                ".env*",
                "**/.env*",
                "**/*.pem",
                "**/*.key",
                "**/*.crt",
                "**/id_rsa*",
                "**/*.min.js",
                "**/*.bundle.js",
                "**/vendor/**",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allow: [
                "src/**",
                "app/**",
                "components/**",
                "lib/**",
                "pages/**",
                "tests/**",
                "__tests__/**",
                "test/**",
                "scripts/**",
                "styles/**",
                "public/**",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_new_file_size_lines: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub edit_keywords: Vec<String>,
    pub retrieve_keywords: Vec<String>,
    /// Full phrases, not bare words — "test" alone must not route to tests.
    pub test_phrases: Vec<String>,
    pub repair_keywords: Vec<String>,
    pub plan_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            edit_keywords: words(&[
                "implement", "create", "write", "update", "modify", "add", "delete", "complete",
                "enhance", "connect", "build",
            ]),
            retrieve_keywords: words(&[
                "analyze", "gather", "research", "review", "read", "examine",
            ]),
            test_phrases: words(&["run test", "run tests", "test suite", "execute test"]),
            repair_keywords: words(&["fix", "debug", "resolve"]),
            plan_keywords: words(&["design", "plan", "clarify"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CheckpointConfig {
    pub max_entries: Option<usize>,
    pub edit_ttl_hours: Option<i64>,
    pub mission_ttl_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub budgets: Budgets,
    pub timeouts: Timeouts,
    pub selector: SelectorConfig,
    pub edit: EditToolConfig,
    pub fence: FenceConfig,
    pub classifier: ClassifierConfig,
    pub checkpoints: CheckpointConfig,
}

impl EngineConfig {
    /// Load from a config file; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Checkpoint policy with config overrides applied.
    pub fn checkpoint_policy(&self) -> ordinex_storage::CheckpointPolicy {
        let defaults = ordinex_storage::CheckpointPolicy::default();
        ordinex_storage::CheckpointPolicy {
            max_entries: self.checkpoints.max_entries.unwrap_or(defaults.max_entries),
            edit_ttl_hours: self
                .checkpoints
                .edit_ttl_hours
                .unwrap_or(defaults.edit_ttl_hours),
            mission_ttl_hours: self
                .checkpoints
                .mission_ttl_hours
                .unwrap_or(defaults.mission_ttl_hours),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
