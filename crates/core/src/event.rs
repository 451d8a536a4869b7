// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the ordinex runtime.
//!
//! Every observable action is an immutable event appended to the task log.
//! The envelope carries identity and ordering context; the payload is a
//! closed tag set serialized as `{"type": "tag_name", ...fields}`.
//! Unknown type tags deserialize to `Unknown` and are never applied.

use crate::approval::{ApprovalDecision, ApprovalId, ApprovalType};
use crate::checkpoint::{CheckpointId, CheckpointReason};
use crate::diff::{DiffId, TouchedFile};
use crate::evidence::EvidenceId;
use crate::id::{EventId, ShortId, TaskId};
use crate::mission::{Mission, MissionId, PlanStep, StepId};
use crate::outcome::{Diagnosis, DiagnosisSource, LoopType};
use crate::sha::StaleFile;
use crate::task::{Mode, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a failure, pause, or halt happened. Closed set; serialized snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    StaleContext,
    HunkMismatch,
    ValidationError,
    ParseError,
    SchemaError,
    Truncation,
    SplitFailed,
    IoError,
    ApplyFailed,
    ApprovalDenied,
    DiffRejected,
    BudgetExhausted,
    RepairBudgetExhausted,
    LoopDetected,
    StageTimeout,
    ExecutionException,
    UserStop,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::StaleContext => "stale_context",
            FailureReason::HunkMismatch => "hunk_mismatch",
            FailureReason::ValidationError => "validation_error",
            FailureReason::ParseError => "parse_error",
            FailureReason::SchemaError => "schema_error",
            FailureReason::Truncation => "truncation",
            FailureReason::SplitFailed => "split_failed",
            FailureReason::IoError => "io_error",
            FailureReason::ApplyFailed => "apply_failed",
            FailureReason::ApprovalDenied => "approval_denied",
            FailureReason::DiffRejected => "diff_rejected",
            FailureReason::BudgetExhausted => "budget_exhausted",
            FailureReason::RepairBudgetExhausted => "repair_budget_exhausted",
            FailureReason::LoopDetected => "loop_detected",
            FailureReason::StageTimeout => "stage_timeout",
            FailureReason::ExecutionException => "execution_exception",
            FailureReason::UserStop => "user_stop",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an event: the closed tag set.
///
/// Serializes with `{"type": "tag_name", ...fields}` format; the envelope
/// flattens it so the tag sits beside the envelope fields on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // -- lifecycle --
    IntentReceived {
        intent: String,
    },
    ModeSet {
        to: Mode,
    },
    ModeChanged {
        from: Mode,
        to: Mode,
    },
    StageChanged {
        from: Stage,
        to: Stage,
    },
    ExecutionPaused {
        reason: FailureReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    ExecutionResumed,
    ExecutionStopped,
    Final {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    TaskInterrupted {
        reason: String,
    },
    TaskRecoveryStarted,
    TaskDiscarded,

    // -- planning --
    PlanCreated {
        title: String,
        steps: Vec<PlanStep>,
    },
    PlanRevised {
        title: String,
        steps: Vec<PlanStep>,
    },
    PlanLargeDetected {
        step_count: u32,
    },
    MissionBreakdownCreated {
        missions: Vec<Mission>,
    },
    MissionSelected {
        mission_id: MissionId,
    },
    MissionStarted {
        mission_id: MissionId,
    },
    MissionCompleted {
        mission_id: MissionId,
    },
    MissionPaused {
        mission_id: MissionId,
        reason: FailureReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    MissionCancelled {
        mission_id: MissionId,
    },

    // -- execution --
    StepStarted {
        step_id: StepId,
        description: String,
    },
    StepCompleted {
        step_id: StepId,
    },
    StepFailed {
        step_id: StepId,
        error: String,
    },
    PatchPlanProposed {
        step_id: StepId,
        files: Vec<PathBuf>,
    },

    // -- retrieval --
    RetrievalStarted {
        query: String,
    },
    RetrievalCompleted {
        paths: Vec<PathBuf>,
    },
    RetrievalFailed {
        error: String,
    },

    // -- tools --
    ToolStart {
        tool: String,
    },
    ToolEnd {
        tool: String,
        ok: bool,
    },

    // -- diffs & checkpoints --
    DiffProposed {
        diff_id: DiffId,
        touched_files: Vec<TouchedFile>,
    },
    DiffApplied {
        diff_id: DiffId,
        files: Vec<PathBuf>,
    },
    CheckpointCreated {
        checkpoint_id: CheckpointId,
        reason: CheckpointReason,
        /// Diff this checkpoint was taken for, when gating an apply.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diff_id: Option<DiffId>,
    },
    CheckpointRestoreStarted {
        checkpoint_id: CheckpointId,
    },
    CheckpointRestored {
        checkpoint_id: CheckpointId,
    },
    ContextSnapshotCreated {
        file_count: u32,
        total_lines: u32,
    },
    StaleContextDetected {
        files: Vec<StaleFile>,
    },

    // -- approvals & scope --
    ApprovalRequested {
        approval_id: ApprovalId,
        approval_type: ApprovalType,
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diff_id: Option<DiffId>,
    },
    ApprovalResolved {
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diff_id: Option<DiffId>,
    },
    ScopeExpansionRequested {
        approval_id: ApprovalId,
        paths: Vec<String>,
    },
    ScopeExpansionResolved {
        approval_id: ApprovalId,
        approved: bool,
    },
    PlanDeviationDetected {
        detail: String,
    },

    // -- tests & repair --
    TestStarted {
        command: String,
    },
    TestCompleted {
        command: String,
        pass_count: i32,
        fail_count: i32,
    },
    TestFailed {
        command: String,
        pass_count: i32,
        fail_count: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure_signature: Option<String>,
    },
    RepairAttemptStarted {
        iteration: u32,
        remaining: u32,
    },
    RepairAttemptCompleted {
        iteration: u32,
        success: bool,
    },
    RepairAttempted {
        diagnosis: Diagnosis,
        source: DiagnosisSource,
    },
    RepeatedFailureDetected {
        signature: String,
        occurrences: u32,
    },
    StageTimeout {
        stage: Stage,
        elapsed_ms: u64,
    },
    FailureDetected {
        reason: FailureReason,
        error_type: String,
        details: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checkpoint_id: Option<CheckpointId>,
        /// "attempted" | "succeeded" | "failed" when a rollback ran.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rollback: Option<String>,
    },

    // -- autonomy --
    AutonomyStarted {
        max_iterations: u32,
    },
    IterationStarted {
        iteration: u32,
    },
    IterationSucceeded {
        iteration: u32,
    },
    IterationFailed {
        iteration: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure_signature: Option<String>,
    },
    BudgetExhausted {
        budget: String,
    },
    AutonomyHalted {
        reason: String,
    },
    AutonomyCompleted,
    AutonomyLoopDetected {
        loop_type: LoopType,
        evidence: serde_json::Value,
    },
    AutonomyDowngraded {
        reason: String,
    },

    // -- memory & observability (informational) --
    MemoryFactsUpdated {
        count: u32,
    },
    SolutionCaptured {
        summary: String,
    },
    StreamDelta {
        chunk: String,
    },
    StreamComplete,
    ModelFallbackUsed {
        from_model: String,
        to_model: String,
    },
    ModeViolation {
        detail: String,
    },

    /// Catch-all for unknown event types (forward compatibility)
    #[serde(other, skip_serializing)]
    Unknown,
}

impl EventPayload {
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::IntentReceived { .. } => "intent_received",
            EventPayload::ModeSet { .. } => "mode_set",
            EventPayload::ModeChanged { .. } => "mode_changed",
            EventPayload::StageChanged { .. } => "stage_changed",
            EventPayload::ExecutionPaused { .. } => "execution_paused",
            EventPayload::ExecutionResumed => "execution_resumed",
            EventPayload::ExecutionStopped => "execution_stopped",
            EventPayload::Final { .. } => "final",
            EventPayload::TaskInterrupted { .. } => "task_interrupted",
            EventPayload::TaskRecoveryStarted => "task_recovery_started",
            EventPayload::TaskDiscarded => "task_discarded",
            EventPayload::PlanCreated { .. } => "plan_created",
            EventPayload::PlanRevised { .. } => "plan_revised",
            EventPayload::PlanLargeDetected { .. } => "plan_large_detected",
            EventPayload::MissionBreakdownCreated { .. } => "mission_breakdown_created",
            EventPayload::MissionSelected { .. } => "mission_selected",
            EventPayload::MissionStarted { .. } => "mission_started",
            EventPayload::MissionCompleted { .. } => "mission_completed",
            EventPayload::MissionPaused { .. } => "mission_paused",
            EventPayload::MissionCancelled { .. } => "mission_cancelled",
            EventPayload::StepStarted { .. } => "step_started",
            EventPayload::StepCompleted { .. } => "step_completed",
            EventPayload::StepFailed { .. } => "step_failed",
            EventPayload::PatchPlanProposed { .. } => "patch_plan_proposed",
            EventPayload::RetrievalStarted { .. } => "retrieval_started",
            EventPayload::RetrievalCompleted { .. } => "retrieval_completed",
            EventPayload::RetrievalFailed { .. } => "retrieval_failed",
            EventPayload::ToolStart { .. } => "tool_start",
            EventPayload::ToolEnd { .. } => "tool_end",
            EventPayload::DiffProposed { .. } => "diff_proposed",
            EventPayload::DiffApplied { .. } => "diff_applied",
            EventPayload::CheckpointCreated { .. } => "checkpoint_created",
            EventPayload::CheckpointRestoreStarted { .. } => "checkpoint_restore_started",
            EventPayload::CheckpointRestored { .. } => "checkpoint_restored",
            EventPayload::ContextSnapshotCreated { .. } => "context_snapshot_created",
            EventPayload::StaleContextDetected { .. } => "stale_context_detected",
            EventPayload::ApprovalRequested { .. } => "approval_requested",
            EventPayload::ApprovalResolved { .. } => "approval_resolved",
            EventPayload::ScopeExpansionRequested { .. } => "scope_expansion_requested",
            EventPayload::ScopeExpansionResolved { .. } => "scope_expansion_resolved",
            EventPayload::PlanDeviationDetected { .. } => "plan_deviation_detected",
            EventPayload::TestStarted { .. } => "test_started",
            EventPayload::TestCompleted { .. } => "test_completed",
            EventPayload::TestFailed { .. } => "test_failed",
            EventPayload::RepairAttemptStarted { .. } => "repair_attempt_started",
            EventPayload::RepairAttemptCompleted { .. } => "repair_attempt_completed",
            EventPayload::RepairAttempted { .. } => "repair_attempted",
            EventPayload::RepeatedFailureDetected { .. } => "repeated_failure_detected",
            EventPayload::StageTimeout { .. } => "stage_timeout",
            EventPayload::FailureDetected { .. } => "failure_detected",
            EventPayload::AutonomyStarted { .. } => "autonomy_started",
            EventPayload::IterationStarted { .. } => "iteration_started",
            EventPayload::IterationSucceeded { .. } => "iteration_succeeded",
            EventPayload::IterationFailed { .. } => "iteration_failed",
            EventPayload::BudgetExhausted { .. } => "budget_exhausted",
            EventPayload::AutonomyHalted { .. } => "autonomy_halted",
            EventPayload::AutonomyCompleted => "autonomy_completed",
            EventPayload::AutonomyLoopDetected { .. } => "autonomy_loop_detected",
            EventPayload::AutonomyDowngraded { .. } => "autonomy_downgraded",
            EventPayload::MemoryFactsUpdated { .. } => "memory_facts_updated",
            EventPayload::SolutionCaptured { .. } => "solution_captured",
            EventPayload::StreamDelta { .. } => "stream_delta",
            EventPayload::StreamComplete => "stream_complete",
            EventPayload::ModelFallbackUsed { .. } => "model_fallback_used",
            EventPayload::ModeViolation { .. } => "mode_violation",
            EventPayload::Unknown => "unknown",
        }
    }

    /// One-line summary for operator logs.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            EventPayload::IntentReceived { intent } => {
                format!("{t} intent={:?}", intent.short(48))
            }
            EventPayload::ModeSet { to } => format!("{t} to={to}"),
            EventPayload::ModeChanged { from, to } => format!("{t} {from}->{to}"),
            EventPayload::StageChanged { from, to } => format!("{t} {from}->{to}"),
            EventPayload::ExecutionPaused { reason, .. } => format!("{t} reason={reason}"),
            EventPayload::TaskInterrupted { reason } => format!("{t} reason={reason}"),
            EventPayload::PlanCreated { title, steps } | EventPayload::PlanRevised { title, steps } => {
                format!("{t} title={:?} steps={}", title.short(32), steps.len())
            }
            EventPayload::PlanLargeDetected { step_count } => format!("{t} steps={step_count}"),
            EventPayload::MissionBreakdownCreated { missions } => {
                format!("{t} missions={}", missions.len())
            }
            EventPayload::MissionSelected { mission_id }
            | EventPayload::MissionStarted { mission_id }
            | EventPayload::MissionCompleted { mission_id }
            | EventPayload::MissionCancelled { mission_id } => format!("{t} id={mission_id}"),
            EventPayload::MissionPaused {
                mission_id, reason, ..
            } => format!("{t} id={mission_id} reason={reason}"),
            EventPayload::StepStarted { step_id, .. }
            | EventPayload::StepCompleted { step_id } => format!("{t} step={step_id}"),
            EventPayload::StepFailed { step_id, error } => {
                format!("{t} step={step_id} error={:?}", error.short(64))
            }
            EventPayload::PatchPlanProposed { step_id, files } => {
                format!("{t} step={step_id} files={}", files.len())
            }
            EventPayload::RetrievalStarted { query } => {
                format!("{t} query={:?}", query.short(48))
            }
            EventPayload::RetrievalCompleted { paths } => format!("{t} paths={}", paths.len()),
            EventPayload::RetrievalFailed { error } => format!("{t} error={:?}", error.short(64)),
            EventPayload::ToolStart { tool } => format!("{t} tool={tool}"),
            EventPayload::ToolEnd { tool, ok } => format!("{t} tool={tool} ok={ok}"),
            EventPayload::DiffProposed {
                diff_id,
                touched_files,
            } => format!("{t} id={diff_id} files={}", touched_files.len()),
            EventPayload::DiffApplied { diff_id, files } => {
                format!("{t} id={diff_id} files={}", files.len())
            }
            EventPayload::CheckpointCreated {
                checkpoint_id,
                reason,
                ..
            } => format!("{t} id={checkpoint_id} reason={reason:?}"),
            EventPayload::CheckpointRestoreStarted { checkpoint_id }
            | EventPayload::CheckpointRestored { checkpoint_id } => {
                format!("{t} id={checkpoint_id}")
            }
            EventPayload::ContextSnapshotCreated {
                file_count,
                total_lines,
            } => format!("{t} files={file_count} lines={total_lines}"),
            EventPayload::StaleContextDetected { files } => format!("{t} files={}", files.len()),
            EventPayload::ApprovalRequested {
                approval_id,
                approval_type,
                ..
            } => format!("{t} id={approval_id} type={approval_type:?}"),
            EventPayload::ApprovalResolved {
                approval_id,
                decision,
                ..
            } => format!("{t} id={approval_id} decision={decision:?}"),
            EventPayload::ScopeExpansionRequested { approval_id, paths } => {
                format!("{t} id={approval_id} paths={}", paths.len())
            }
            EventPayload::ScopeExpansionResolved {
                approval_id,
                approved,
            } => format!("{t} id={approval_id} approved={approved}"),
            EventPayload::TestStarted { command } => format!("{t} cmd={:?}", command.short(48)),
            EventPayload::TestCompleted {
                pass_count,
                fail_count,
                ..
            }
            | EventPayload::TestFailed {
                pass_count,
                fail_count,
                ..
            } => format!("{t} pass={pass_count} fail={fail_count}"),
            EventPayload::RepairAttemptStarted {
                iteration,
                remaining,
            } => format!("{t} iteration={iteration} remaining={remaining}"),
            EventPayload::RepairAttemptCompleted { iteration, success } => {
                format!("{t} iteration={iteration} success={success}")
            }
            EventPayload::RepairAttempted { source, .. } => format!("{t} source={source:?}"),
            EventPayload::RepeatedFailureDetected {
                signature,
                occurrences,
            } => format!("{t} occurrences={occurrences} sig={:?}", signature.short(48)),
            EventPayload::StageTimeout { stage, elapsed_ms } => {
                format!("{t} stage={stage} elapsed_ms={elapsed_ms}")
            }
            EventPayload::FailureDetected { reason, .. } => format!("{t} reason={reason}"),
            EventPayload::AutonomyStarted { max_iterations } => {
                format!("{t} max_iterations={max_iterations}")
            }
            EventPayload::IterationStarted { iteration }
            | EventPayload::IterationSucceeded { iteration } => {
                format!("{t} iteration={iteration}")
            }
            EventPayload::IterationFailed { iteration, .. } => format!("{t} iteration={iteration}"),
            EventPayload::BudgetExhausted { budget } => format!("{t} budget={budget}"),
            EventPayload::AutonomyHalted { reason } | EventPayload::AutonomyDowngraded { reason } => {
                format!("{t} reason={:?}", reason.short(48))
            }
            EventPayload::AutonomyLoopDetected { loop_type, .. } => {
                format!("{t} loop_type={loop_type:?}")
            }
            EventPayload::MemoryFactsUpdated { count } => format!("{t} count={count}"),
            EventPayload::SolutionCaptured { summary } => {
                format!("{t} summary={:?}", summary.short(48))
            }
            EventPayload::StreamDelta { chunk } => format!("{t} len={}", chunk.len()),
            EventPayload::ModelFallbackUsed {
                from_model,
                to_model,
            } => format!("{t} {from_model}->{to_model}"),
            EventPayload::ModeViolation { detail } => format!("{t} detail={:?}", detail.short(48)),
            EventPayload::ExecutionResumed
            | EventPayload::ExecutionStopped
            | EventPayload::Final { .. }
            | EventPayload::TaskRecoveryStarted
            | EventPayload::TaskDiscarded
            | EventPayload::PlanDeviationDetected { .. }
            | EventPayload::AutonomyCompleted
            | EventPayload::StreamComplete
            | EventPayload::Unknown => t.to_string(),
        }
    }
}

/// The atomic unit of audit: an immutable, totally-ordered log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub task_id: TaskId,
    /// ISO-8601 UTC wall-clock time of emission.
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_ids: Vec<EvidenceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<EventId>,
}

impl Event {
    pub fn new(
        event_id: EventId,
        task_id: TaskId,
        timestamp: DateTime<Utc>,
        mode: Mode,
        stage: Stage,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id,
            task_id,
            timestamp,
            payload,
            mode,
            stage,
            evidence_ids: Vec::new(),
            parent_event_id: None,
        }
    }

    pub fn with_evidence(mut self, ids: Vec<EvidenceId>) -> Self {
        self.evidence_ids = ids;
        self
    }

    pub fn with_parent(mut self, parent: EventId) -> Self {
        self.parent_event_id = Some(parent);
        self
    }

    /// Tag name of the payload.
    pub fn kind(&self) -> &'static str {
        self.payload.name()
    }

    pub fn log_summary(&self) -> String {
        format!("task={} {}", self.task_id.short(8), self.payload.log_summary())
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
