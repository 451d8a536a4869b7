// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task modes, stages, and derived task state.

use crate::approval::ApprovalId;
use crate::checkpoint::CheckpointId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Interaction mode of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Answer,
    Plan,
    Mission,
    Scaffold,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Answer => write!(f, "answer"),
            Mode::Plan => write!(f, "plan"),
            Mode::Mission => write!(f, "mission"),
            Mode::Scaffold => write!(f, "scaffold"),
        }
    }
}

/// Coarse activity label carried on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    None,
    Plan,
    Retrieve,
    Edit,
    Test,
    Repair,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::None => write!(f, "none"),
            Stage::Plan => write!(f, "plan"),
            Stage::Retrieve => write!(f, "retrieve"),
            Stage::Edit => write!(f, "edit"),
            Stage::Test => write!(f, "test"),
            Stage::Repair => write!(f, "repair"),
        }
    }
}

/// Lifecycle status of a task, derived by the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Complete,
    Error,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Idle => write!(f, "idle"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Paused => write!(f, "paused"),
            TaskStatus::Complete => write!(f, "complete"),
            TaskStatus::Error => write!(f, "error"),
        }
    }
}

/// Iteration counter with an optional ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IterationCounter {
    pub current: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl IterationCounter {
    pub fn remaining(&self) -> Option<u32> {
        self.max.map(|m| m.saturating_sub(self.current))
    }

    pub fn exhausted(&self) -> bool {
        matches!(self.remaining(), Some(0))
    }
}

/// Summary of a mission's declared scope, kept on task state for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScopeSummary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub likely_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub out_of_scope: Vec<String>,
}

/// Derived state of a task.
///
/// Never persisted directly; always reconstructed by folding the event
/// stream. Re-folding the same events must produce identical state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskState {
    pub mode: Mode,
    pub status: TaskStatus,
    pub stage: Stage,
    #[serde(default)]
    pub iteration: IterationCounter,
    /// Remaining repair attempts, once a repair budget is announced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_approvals: Vec<ApprovalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_checkpoint: Option<CheckpointId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeSummary>,
    /// Reason carried by the most recent pause, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Complete)
    }

    pub fn has_pending_approvals(&self) -> bool {
        !self.pending_approvals.is_empty()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
