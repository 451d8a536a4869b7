// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Autonomy loop detection.
//!
//! Pure pattern-matcher over recent iteration outcomes. Four detectors in
//! strict priority order: stuck > regressing > oscillating > scope creep.
//! The detector never mutates state; the runner decides what to do with
//! the verdict.

use ordinex_core::{IterationOutcome, LoopType};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Result of a loop check.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopVerdict {
    pub detected: bool,
    pub loop_type: Option<LoopType>,
    pub evidence: serde_json::Value,
    pub recommendation: String,
}

impl LoopVerdict {
    fn none() -> Self {
        Self {
            detected: false,
            loop_type: None,
            evidence: serde_json::Value::Null,
            recommendation: String::new(),
        }
    }
}

/// Signature used for oscillation comparison: the failure signature when
/// present, else the success flag.
fn oscillation_key(outcome: &IterationOutcome) -> String {
    match &outcome.failure_signature {
        Some(sig) => sig.clone(),
        None => format!("success={}", outcome.success),
    }
}

fn detect_stuck(history: &[IterationOutcome]) -> Option<LoopVerdict> {
    if history.len() < 3 {
        return None;
    }
    let last_three = &history[history.len() - 3..];

    // Most recent signature appearing in ≥2 of the last three
    if let Some(recent) = history
        .last()
        .and_then(|o| o.failure_signature.as_ref())
    {
        let occurrences = last_three
            .iter()
            .filter(|o| o.failure_signature.as_deref() == Some(recent.as_str()))
            .count();
        let consecutive = last_three
            .iter()
            .all(|o| o.failure_signature.as_deref() == Some(recent.as_str()));
        if occurrences >= 2 || consecutive {
            return Some(LoopVerdict {
                detected: true,
                loop_type: Some(LoopType::Stuck),
                evidence: serde_json::json!({
                    "signature": recent,
                    "occurrences": occurrences,
                }),
                recommendation: "same failure keeps recurring; pause and surface the diagnosis"
                    .to_string(),
            });
        }
    }
    None
}

fn detect_regressing(history: &[IterationOutcome]) -> Option<LoopVerdict> {
    if history.len() < 3 {
        return None;
    }
    let last_three = &history[history.len() - 3..];
    let counts: Vec<i32> = last_three.iter().map(|o| o.test_pass_count).collect();
    let strictly_decreasing = counts[0] > counts[1] && counts[1] > counts[2];
    if strictly_decreasing && counts.iter().all(|&c| c >= 0) {
        return Some(LoopVerdict {
            detected: true,
            loop_type: Some(LoopType::Regressing),
            evidence: serde_json::json!({ "pass_counts": counts }),
            recommendation: "each fix loses ground; restore the checkpoint and re-plan"
                .to_string(),
        });
    }
    None
}

fn detect_oscillating(history: &[IterationOutcome]) -> Option<LoopVerdict> {
    if history.len() < 4 {
        return None;
    }
    let last_four = &history[history.len() - 4..];
    let keys: Vec<String> = last_four.iter().map(oscillation_key).collect();
    let abab = keys[0] == keys[2] && keys[1] == keys[3] && keys[0] != keys[1];
    if abab {
        return Some(LoopVerdict {
            detected: true,
            loop_type: Some(LoopType::Oscillating),
            evidence: serde_json::json!({ "pattern": keys }),
            recommendation: "fixes alternate between two states; a different approach is needed"
                .to_string(),
        });
    }
    None
}

fn detect_scope_creep(
    history: &[IterationOutcome],
    scope: &BTreeSet<PathBuf>,
) -> Option<LoopVerdict> {
    if scope.is_empty() {
        return None;
    }
    // Aggregate comparison: the union across the whole history
    let mut outside: BTreeSet<&PathBuf> = BTreeSet::new();
    for outcome in history {
        for path in &outcome.files_touched {
            if !scope.contains(path) {
                outside.insert(path);
            }
        }
    }
    if outside.is_empty() {
        return None;
    }
    let files: Vec<String> = outside
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    Some(LoopVerdict {
        detected: true,
        loop_type: Some(LoopType::ScopeCreep),
        evidence: serde_json::json!({ "files_outside_scope": files }),
        recommendation: "edits are drifting outside the declared scope; request an expansion"
            .to_string(),
    })
}

/// Check the iteration history for an unproductive pattern.
///
/// Priority: stuck > regressing > oscillating > scope_creep.
pub fn detect_loop(history: &[IterationOutcome], scope: &BTreeSet<PathBuf>) -> LoopVerdict {
    detect_stuck(history)
        .or_else(|| detect_regressing(history))
        .or_else(|| detect_oscillating(history))
        .or_else(|| detect_scope_creep(history, scope))
        .unwrap_or_else(LoopVerdict::none)
}

#[cfg(test)]
#[path = "loop_detector_tests.rs"]
mod tests;
