// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived task state from event replay.
//!
//! `reduce` is a pure fold: the same event sequence always produces the
//! same state, on every platform and every re-fold. Unknown payload tags
//! are logged and skipped — the forward-compatibility seam.

use ordinex_core::{
    Event, EventPayload, FailureReason, Mission, Mode, PlanStep, ScopeSummary, TaskId, TaskState,
    TaskStatus,
};
use std::collections::HashMap;
use tracing::debug;

/// Materialized state for all tasks seen in a log.
#[derive(Debug, Clone, Default)]
pub struct TaskStates {
    tasks: HashMap<TaskId, TaskState>,
    /// Mission breakdowns seen per task, for resolving a later selection
    /// into a scope summary.
    breakdowns: HashMap<TaskId, Vec<Mission>>,
}

impl TaskStates {
    pub fn get(&self, task_id: &TaskId) -> Option<&TaskState> {
        self.tasks.get(task_id)
    }

    pub fn tasks(&self) -> &HashMap<TaskId, TaskState> {
        &self.tasks
    }

    /// Apply one event. Exactly one transition rule per payload tag.
    pub fn apply_event(&mut self, event: &Event) {
        let task_id = event.task_id.clone();
        let state = self.tasks.entry(task_id.clone()).or_default();

        match &event.payload {
            EventPayload::IntentReceived { .. } => {
                state.mode = event.mode;
                state.status = TaskStatus::Running;
            }
            EventPayload::ModeSet { to } => state.mode = *to,
            EventPayload::ModeChanged { to, .. } => state.mode = *to,
            EventPayload::StageChanged { to, .. } => state.stage = *to,

            EventPayload::PlanCreated { steps, .. } | EventPayload::PlanRevised { steps, .. } => {
                // A fresh plan awaits approval before anything executes
                if state.mode == Mode::Plan || event.mode == Mode::Plan {
                    state.status = TaskStatus::Paused;
                }
                if state.scope.is_none() {
                    state.scope = Some(ScopeSummary::default());
                }
                let _ = steps;
            }

            EventPayload::MissionBreakdownCreated { missions } => {
                self.breakdowns.insert(task_id, missions.clone());
            }
            EventPayload::MissionSelected { mission_id } => {
                if let Some(missions) = self.breakdowns.get(&task_id) {
                    if let Some(mission) = missions.iter().find(|m| &m.mission_id == mission_id) {
                        state.scope = Some(ScopeSummary {
                            likely_files: mission.scope.likely_files.clone(),
                            out_of_scope: mission.scope.out_of_scope.clone(),
                        });
                    }
                }
            }

            EventPayload::MissionStarted { .. } => {
                state.status = TaskStatus::Running;
                state.pause_reason = None;
            }
            EventPayload::MissionCompleted { .. } | EventPayload::Final { .. } => {
                state.status = TaskStatus::Complete;
            }
            EventPayload::MissionPaused { reason, .. } => {
                state.status = TaskStatus::Paused;
                state.pause_reason = Some(reason.as_str().to_string());
            }
            EventPayload::StageTimeout { .. } => {
                state.status = TaskStatus::Paused;
                state.pause_reason = Some(FailureReason::StageTimeout.as_str().to_string());
            }
            EventPayload::BudgetExhausted { budget } => {
                state.status = TaskStatus::Paused;
                state.pause_reason = Some(format!("budget_exhausted:{budget}"));
            }
            EventPayload::AutonomyLoopDetected { loop_type, .. } => {
                state.status = TaskStatus::Paused;
                state.pause_reason = Some(format!("loop_detected:{loop_type:?}"));
            }
            EventPayload::RepeatedFailureDetected { .. } => {
                state.status = TaskStatus::Paused;
            }
            EventPayload::MissionCancelled { .. } | EventPayload::TaskDiscarded => {
                state.status = TaskStatus::Idle;
                state.pending_approvals.clear();
            }

            EventPayload::ExecutionPaused { reason, .. } => {
                state.status = TaskStatus::Paused;
                state.pause_reason = Some(reason.as_str().to_string());
            }
            EventPayload::ExecutionResumed => {
                state.status = TaskStatus::Running;
                state.pause_reason = None;
            }

            EventPayload::ApprovalRequested { approval_id, .. } => {
                if !state.pending_approvals.contains(approval_id) {
                    state.pending_approvals.push(approval_id.clone());
                }
                state.status = TaskStatus::Paused;
            }
            EventPayload::ApprovalResolved { approval_id, .. } => {
                state.pending_approvals.retain(|id| id != approval_id);
                if state.pending_approvals.is_empty() {
                    state.status = TaskStatus::Running;
                }
            }
            EventPayload::ScopeExpansionRequested { approval_id, .. } => {
                if !state.pending_approvals.contains(approval_id) {
                    state.pending_approvals.push(approval_id.clone());
                }
                state.status = TaskStatus::Paused;
            }
            EventPayload::ScopeExpansionResolved {
                approval_id,
                approved,
            } => {
                state.pending_approvals.retain(|id| id != approval_id);
                if state.pending_approvals.is_empty() {
                    state.status = TaskStatus::Running;
                }
                let _ = approved;
            }

            EventPayload::AutonomyStarted { max_iterations } => {
                state.iteration.max = Some(*max_iterations);
            }
            EventPayload::IterationStarted { .. } => {
                state.iteration.current += 1;
            }
            EventPayload::RepairAttemptStarted { remaining, .. } => {
                state.repair_remaining = Some(*remaining);
            }

            EventPayload::CheckpointCreated { checkpoint_id, .. } => {
                state.active_checkpoint = Some(checkpoint_id.clone());
            }

            EventPayload::FailureDetected { reason, .. } => {
                if *reason == FailureReason::ExecutionException {
                    state.status = TaskStatus::Error;
                }
            }

            EventPayload::Unknown => {
                debug!(task = %event.task_id, "unknown event tag, skipping");
            }

            // Logged for audit; no core task-state transition
            EventPayload::ExecutionStopped
            | EventPayload::TaskInterrupted { .. }
            | EventPayload::TaskRecoveryStarted
            | EventPayload::PlanLargeDetected { .. }
            | EventPayload::StepStarted { .. }
            | EventPayload::StepCompleted { .. }
            | EventPayload::StepFailed { .. }
            | EventPayload::PatchPlanProposed { .. }
            | EventPayload::RetrievalStarted { .. }
            | EventPayload::RetrievalCompleted { .. }
            | EventPayload::RetrievalFailed { .. }
            | EventPayload::ToolStart { .. }
            | EventPayload::ToolEnd { .. }
            | EventPayload::DiffProposed { .. }
            | EventPayload::DiffApplied { .. }
            | EventPayload::CheckpointRestoreStarted { .. }
            | EventPayload::CheckpointRestored { .. }
            | EventPayload::ContextSnapshotCreated { .. }
            | EventPayload::StaleContextDetected { .. }
            | EventPayload::PlanDeviationDetected { .. }
            | EventPayload::TestStarted { .. }
            | EventPayload::TestCompleted { .. }
            | EventPayload::TestFailed { .. }
            | EventPayload::RepairAttemptCompleted { .. }
            | EventPayload::RepairAttempted { .. }
            | EventPayload::IterationSucceeded { .. }
            | EventPayload::IterationFailed { .. }
            | EventPayload::AutonomyHalted { .. }
            | EventPayload::AutonomyCompleted
            | EventPayload::AutonomyDowngraded { .. }
            | EventPayload::MemoryFactsUpdated { .. }
            | EventPayload::SolutionCaptured { .. }
            | EventPayload::StreamDelta { .. }
            | EventPayload::StreamComplete
            | EventPayload::ModelFallbackUsed { .. }
            | EventPayload::ModeViolation { .. } => {}
        }
    }
}

/// Fold an event sequence into per-task state. Pure and deterministic.
pub fn reduce(events: &[Event]) -> TaskStates {
    let mut states = TaskStates::default();
    for event in events {
        states.apply_event(event);
    }
    states
}

/// Derived view: the current scope summary for a task, if any mission
/// has been selected (falling back to the sole mission of a breakdown).
pub fn scope_summary(events: &[Event], task_id: &TaskId) -> Option<ScopeSummary> {
    let mut breakdown: Option<&Vec<Mission>> = None;
    let mut selected: Option<ScopeSummary> = None;
    for event in events.iter().filter(|e| &e.task_id == task_id) {
        match &event.payload {
            EventPayload::MissionBreakdownCreated { missions } => breakdown = Some(missions),
            EventPayload::MissionSelected { mission_id } => {
                if let Some(mission) = breakdown
                    .and_then(|ms| ms.iter().find(|m| &m.mission_id == mission_id))
                {
                    selected = Some(ScopeSummary {
                        likely_files: mission.scope.likely_files.clone(),
                        out_of_scope: mission.scope.out_of_scope.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    selected.or_else(|| {
        breakdown.and_then(|ms| match ms.as_slice() {
            [only] => Some(ScopeSummary {
                likely_files: only.scope.likely_files.clone(),
                out_of_scope: only.scope.out_of_scope.clone(),
            }),
            _ => None,
        })
    })
}

/// Derived view: the latest plan (title + steps) for a task.
pub fn derive_plan(events: &[Event], task_id: &TaskId) -> Option<(String, Vec<PlanStep>)> {
    let mut latest = None;
    for event in events.iter().filter(|e| &e.task_id == task_id) {
        if let EventPayload::PlanCreated { title, steps }
        | EventPayload::PlanRevised { title, steps } = &event.payload
        {
            latest = Some((title.clone(), steps.clone()));
        }
    }
    latest
}

#[cfg(test)]
#[path = "reducer_tests.rs"]
mod tests;
