// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Iteration outcomes, loop verdicts, and repair diagnoses.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-iteration record consumed by the loop detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationOutcome {
    pub iteration: u32,
    pub success: bool,
    /// Normalised error string; None on success or when no signature could
    /// be extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_signature: Option<String>,
    #[serde(default)]
    pub test_pass_count: i32,
    #[serde(default)]
    pub test_fail_count: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_touched: Vec<PathBuf>,
}

/// Kind of unproductive pattern the loop detector recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopType {
    Stuck,
    Regressing,
    Oscillating,
    ScopeCreep,
}

/// Where a repair diagnosis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisSource {
    Llm,
    Heuristic,
}

/// Structured diagnosis of a test failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Diagnosis {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub likely_causes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
