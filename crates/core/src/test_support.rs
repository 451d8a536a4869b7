// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::approval::{ApprovalDecision, ApprovalId, ApprovalType};
use crate::checkpoint::{CheckpointId, CheckpointReason};
use crate::diff::{DiffId, FileAction, TouchedFile};
use crate::event::{Event, EventPayload};
use crate::id::{EventId, TaskId};
use crate::mission::{Mission, MissionId, MissionScope, PlanStep, StepId};
use crate::task::{Mode, Stage};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Fixed timestamp so refold comparisons are byte-stable.
pub fn fixed_time() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_000_000).unwrap_or_default()
}

/// Wrap a payload in an envelope with deterministic identity fields.
pub fn envelope(task_id: &str, seq: u32, payload: EventPayload) -> Event {
    Event::new(
        EventId::new(format!("evt-{seq}")),
        TaskId::new(task_id),
        fixed_time(),
        Mode::Mission,
        Stage::None,
        payload,
    )
}

pub fn intent_event(task_id: &str, seq: u32, intent: &str) -> Event {
    envelope(
        task_id,
        seq,
        EventPayload::IntentReceived {
            intent: intent.to_string(),
        },
    )
}

pub fn mission_started_event(task_id: &str, seq: u32, mission_id: &str) -> Event {
    envelope(
        task_id,
        seq,
        EventPayload::MissionStarted {
            mission_id: MissionId::new(mission_id),
        },
    )
}

pub fn approval_requested_event(task_id: &str, seq: u32, approval_id: &str) -> Event {
    envelope(
        task_id,
        seq,
        EventPayload::ApprovalRequested {
            approval_id: ApprovalId::new(approval_id),
            approval_type: ApprovalType::ApplyDiff,
            description: "Apply proposed diff".to_string(),
            diff_id: None,
        },
    )
}

pub fn approval_resolved_event(
    task_id: &str,
    seq: u32,
    approval_id: &str,
    decision: ApprovalDecision,
) -> Event {
    envelope(
        task_id,
        seq,
        EventPayload::ApprovalResolved {
            approval_id: ApprovalId::new(approval_id),
            decision,
            diff_id: None,
        },
    )
}

pub fn checkpoint_created_event(task_id: &str, seq: u32, checkpoint_id: &str) -> Event {
    envelope(
        task_id,
        seq,
        EventPayload::CheckpointCreated {
            checkpoint_id: CheckpointId::new(checkpoint_id),
            reason: CheckpointReason::PreEdit,
            diff_id: None,
        },
    )
}

pub fn touched_update(path: &str, base_sha: &str) -> TouchedFile {
    TouchedFile {
        path: PathBuf::from(path),
        action: FileAction::Update,
        base_sha: Some(base_sha.to_string()),
        new_content: None,
        lines_added: 1,
        lines_removed: 1,
    }
}

pub fn diff_proposed_event(task_id: &str, seq: u32, diff_id: &str, path: &str) -> Event {
    envelope(
        task_id,
        seq,
        EventPayload::DiffProposed {
            diff_id: DiffId::new(diff_id),
            touched_files: vec![touched_update(path, "a1b2c3d4e5f6")],
        },
    )
}

pub fn single_step_mission(mission_id: &str, description: &str, likely: &[&str]) -> Mission {
    Mission {
        mission_id: MissionId::new(mission_id),
        title: description.to_string(),
        scope: MissionScope {
            likely_files: likely.iter().map(PathBuf::from).collect(),
            out_of_scope: Vec::new(),
        },
        included_steps: vec![PlanStep {
            step_id: StepId::new("step-1"),
            description: description.to_string(),
            stage: Stage::None,
        }],
        verification: None,
    }
}
