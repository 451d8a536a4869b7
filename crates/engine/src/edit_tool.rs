// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Truncation-safe LLM edit calls.
//!
//! The model returns `{unified_diff, touched_files, confidence, notes,
//! validation_status, complete}`. A response that stopped at the token
//! ceiling, or that is missing the `complete: true` sentinel, retries
//! with a narrower file subset until the chunk budget runs out.

use crate::config::EditToolConfig;
use crate::selector::FileExcerpt;
use ordinex_adapters::{LlmAdapter, LlmError, LlmMessage, LlmRequest};
use ordinex_patch::{parse, validate, verify_declared_shas, FileDiff, PatchError, ValidationPolicy};
use ordinex_core::TouchedFile;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Per-call limits the output must respect.
#[derive(Debug, Clone, Default)]
pub struct EditConstraints {
    pub max_files: usize,
    pub max_changed_lines: usize,
    /// When set, every touched path must be in this list.
    pub allowed_paths: Option<Vec<PathBuf>>,
    pub allow_creates: bool,
    pub allow_deletes: bool,
}

/// What went wrong, as a closed taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditErrorType {
    ValidationError,
    ParseError,
    SchemaError,
    Truncation,
    SplitFailed,
    Unknown,
}

#[derive(Debug, Clone, Error)]
#[error("edit failed ({error_type:?}): {message}")]
pub struct EditError {
    pub error_type: EditErrorType,
    pub message: String,
    pub details: Option<String>,
}

impl EditError {
    fn new(error_type: EditErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            details: None,
        }
    }
}

/// The model's structured edit response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditOutput {
    pub unified_diff: String,
    #[serde(default)]
    pub touched_files: Vec<TouchedFile>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub validation_status: Option<String>,
    /// Sentinel the prompt demands; its absence means truncation.
    #[serde(default)]
    pub complete: bool,
}

/// A validated edit: the model output plus its parsed diff.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub output: EditOutput,
    pub files: Vec<FileDiff>,
}

const EDIT_SYSTEM_PROMPT: &str = "\
You produce a minimal unified diff for the requested change. Respond with
JSON only:
{\"unified_diff\": \"...\", \"touched_files\": [{\"path\": \"...\",
 \"action\": \"create|update|delete\", \"base_sha\": \"...\"}],
 \"confidence\": 0.0, \"notes\": \"...\", \"validation_status\": \"ok\",
 \"complete\": true}
Each touched file's base_sha must copy the sha shown with its excerpt.
Only touch the files provided. Always end with \"complete\": true.";

pub struct EditTool<L: LlmAdapter> {
    llm: Arc<L>,
    config: EditToolConfig,
}

impl<L: LlmAdapter> EditTool<L> {
    pub fn new(llm: Arc<L>, config: EditToolConfig) -> Self {
        Self { llm, config }
    }

    fn build_request(&self, step_text: &str, excerpts: &[FileExcerpt]) -> LlmRequest {
        let mut user = String::new();
        let _ = writeln!(user, "Task: {step_text}\n");
        for excerpt in excerpts {
            let _ = writeln!(
                user,
                "File: {} (base_sha: {}{})",
                excerpt.path.display(),
                excerpt.base_sha,
                if excerpt.is_full_file { "" } else { ", excerpt" },
            );
            let _ = writeln!(user, "{}", excerpt.content_with_line_numbers);
        }
        LlmRequest {
            messages: vec![
                LlmMessage::system(EDIT_SYSTEM_PROMPT),
                LlmMessage::user(user),
            ],
            tools: vec![],
            max_tokens: self.config.max_tokens,
        }
    }

    /// Run the edit call, splitting by file on truncation.
    pub async fn generate(
        &self,
        step_text: &str,
        excerpts: &[FileExcerpt],
        constraints: &EditConstraints,
    ) -> Result<EditOutcome, EditError> {
        let mut chunks: VecDeque<Vec<FileExcerpt>> = VecDeque::new();
        chunks.push_back(excerpts.to_vec());

        let mut attempts: HashMap<Vec<PathBuf>, usize> = HashMap::new();
        let mut calls = 0usize;
        let mut collected: Vec<EditOutput> = Vec::new();

        while let Some(chunk) = chunks.pop_front() {
            if calls >= self.config.max_total_chunks {
                return Err(EditError::new(
                    EditErrorType::SplitFailed,
                    format!("chunk budget of {} exhausted", self.config.max_total_chunks),
                ));
            }
            calls += 1;

            let response = match self.llm.send(self.build_request(step_text, &chunk)).await {
                Ok(r) => r,
                Err(LlmError::Interrupted) => {
                    return Err(EditError::new(EditErrorType::Unknown, "call interrupted"))
                }
                Err(e) => return Err(EditError::new(EditErrorType::Unknown, e.to_string())),
            };

            let truncated = response.truncated();
            let parsed = (!truncated)
                .then(|| serde_json::from_str::<EditOutput>(&response.content))
                .map(|r| r.map_err(|e| e.to_string()));

            let incomplete = match parsed {
                Some(Ok(output)) if output.complete => {
                    collected.push(output);
                    continue;
                }
                other => other,
            };

            // Truncated, incomplete, or unparseable: narrow or retry.
            let key: Vec<PathBuf> = chunk.iter().map(|e| e.path.clone()).collect();
            let attempt = attempts.entry(key).or_insert(0);
            *attempt += 1;

            if chunk.len() > 1 && chunk.len() > self.config.max_files_before_split / 2 {
                let mid = chunk.len() / 2;
                info!(files = chunk.len(), "splitting edit call after incomplete output");
                let (left, right) = chunk.split_at(mid.max(1));
                chunks.push_back(left.to_vec());
                chunks.push_back(right.to_vec());
                continue;
            }

            if *attempt < self.config.max_attempts_per_file {
                warn!(attempt = *attempt, "retrying incomplete edit call");
                chunks.push_front(chunk);
                continue;
            }

            return Err(match incomplete {
                Some(Err(json_error)) => EditError {
                    error_type: EditErrorType::ParseError,
                    message: "model output is not valid JSON".to_string(),
                    details: Some(json_error),
                },
                Some(Ok(_)) => EditError::new(
                    EditErrorType::Truncation,
                    "model never produced the complete sentinel",
                ),
                None => EditError::new(
                    EditErrorType::Truncation,
                    "model output truncated at the token ceiling",
                ),
            });
        }

        self.merge_and_validate(collected, excerpts, constraints)
    }

    fn merge_and_validate(
        &self,
        outputs: Vec<EditOutput>,
        excerpts: &[FileExcerpt],
        constraints: &EditConstraints,
    ) -> Result<EditOutcome, EditError> {
        if outputs.is_empty() {
            return Err(EditError::new(
                EditErrorType::SchemaError,
                "model returned no edit output",
            ));
        }

        let mut unified_diff = String::new();
        let mut touched: Vec<TouchedFile> = Vec::new();
        let mut confidence: Option<f32> = None;
        for output in &outputs {
            unified_diff.push_str(&output.unified_diff);
            if !output.unified_diff.ends_with('\n') && !output.unified_diff.is_empty() {
                unified_diff.push('\n');
            }
            for file in &output.touched_files {
                if !touched.iter().any(|t| t.path == file.path) {
                    touched.push(file.clone());
                }
            }
            confidence = match (confidence, output.confidence) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }

        let files = parse(&unified_diff).map_err(|e| EditError {
            error_type: EditErrorType::ParseError,
            message: "unified diff does not parse".to_string(),
            details: Some(e.to_string()),
        })?;

        let policy = ValidationPolicy {
            allow_creates: constraints.allow_creates,
            allow_deletes: constraints.allow_deletes,
            allow_renames: false,
            max_files: constraints.max_files,
            max_changed_lines: constraints.max_changed_lines,
        };
        validate(&files, &policy).map_err(|e| EditError {
            error_type: EditErrorType::ValidationError,
            message: e.to_string(),
            details: None,
        })?;

        if let Some(allowed) = &constraints.allowed_paths {
            for file in &files {
                if let Some(path) = file.path() {
                    if !allowed.contains(path) {
                        return Err(EditError::new(
                            EditErrorType::ValidationError,
                            format!("diff touches disallowed path {}", path.display()),
                        ));
                    }
                }
            }
        }

        // Preconditions: declared shas must match what the excerpts carried
        let expected: HashMap<PathBuf, String> = excerpts
            .iter()
            .map(|e| (e.path.clone(), e.base_sha.clone()))
            .collect();
        verify_declared_shas(&files, &touched, &expected).map_err(|e| {
            let error_type = match e {
                PatchError::ShaMismatch { .. }
                | PatchError::MissingSha(_)
                | PatchError::UndeclaredFile(_) => EditErrorType::ValidationError,
                _ => EditErrorType::Unknown,
            };
            EditError {
                error_type,
                message: e.to_string(),
                details: None,
            }
        })?;

        // Line counts come from the parsed diff, not the model's claim
        for entry in &mut touched {
            if let Some(file) = files.iter().find(|f| f.path() == Some(&entry.path)) {
                entry.lines_added = file.lines_added();
                entry.lines_removed = file.lines_removed();
            }
        }

        Ok(EditOutcome {
            output: EditOutput {
                unified_diff,
                touched_files: touched,
                confidence,
                notes: None,
                validation_status: Some("ok".to_string()),
                complete: true,
            },
            files,
        })
    }
}

#[cfg(test)]
#[path = "edit_tool_tests.rs"]
mod tests;
