// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ordinex-engine: the execution engine.
//!
//! Hosts the event bus, approval protocol, diff pipeline, and the mission
//! state machine. Everything observable goes through the bus; nothing
//! touches the workspace without an approval and a checkpoint first.

mod applier;
mod approvals;
mod bus;
mod config;
mod edit_tool;
mod emitter;
mod error;
mod fence;
mod judge;
mod loop_detector;
mod mission;
mod repair;
mod scope;
mod selector;
mod steps;
#[cfg(test)]
mod test_helpers;

pub use applier::{ApplyError, CommitFs, DiffApplier, RealFs};
pub use approvals::ApprovalManager;
pub use bus::{BusError, EventBus, EventFilter};
pub use config::{
    Budgets, ClassifierConfig, EditToolConfig, EngineConfig, FenceConfig, SelectorConfig, Timeouts,
};
pub use edit_tool::{EditConstraints, EditError, EditErrorType, EditOutcome, EditOutput, EditTool};
pub use emitter::Emitter;
pub use error::EngineError;
pub use fence::{CreatePathFence, FenceDecision};
pub use judge::{Clarity, Intent, JudgeVerdict, PromptJudge};
pub use loop_detector::{detect_loop, LoopVerdict};
pub use mission::{recover, MissionDeps, MissionRunner, MissionStage, RecoveredMission, StopHandle};
pub use scope::ScopeGuard;
pub use selector::{extract_keywords, ExcerptSelector, FileExcerpt, SelectionInput};
pub use steps::classify_step;
