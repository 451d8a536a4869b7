// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission and plan-step types.

use crate::task::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a mission.
    pub struct MissionId;
}

crate::define_id! {
    /// Stable identifier for a plan step within a mission.
    pub struct StepId;
}

/// Declared scope of a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MissionScope {
    /// Files the plan expects to touch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub likely_files: Vec<PathBuf>,
    /// Globs the mission must not touch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub out_of_scope: Vec<String>,
}

/// Atomic unit of execution within a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_id: StepId,
    pub description: String,
    /// Stage derived from the description by the step classifier.
    #[serde(default)]
    pub stage: Stage,
}

impl PlanStep {
    pub fn new(step_id: impl Into<StepId>, description: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            description: description.into(),
            stage: Stage::None,
        }
    }
}

/// How the mission's outcome should be verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VerificationPlan {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
}

/// A user-facing unit of work: an approved plan the runner executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub mission_id: MissionId,
    pub title: String,
    #[serde(default)]
    pub scope: MissionScope,
    pub included_steps: Vec<PlanStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationPlan>,
}

impl Mission {
    pub fn step(&self, step_id: &StepId) -> Option<&PlanStep> {
        self.included_steps.iter().find(|s| &s.step_id == step_id)
    }
}

#[cfg(test)]
#[path = "mission_tests.rs"]
mod tests;
