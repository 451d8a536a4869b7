//! Behavioral specifications for the ordinex runtime.
//!
//! These tests drive the real engine against fake adapters in a temp
//! workspace and verify the event log, the workspace bytes, and the
//! terminal stage.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// mission/
#[path = "specs/mission/happy_path.rs"]
mod mission_happy_path;
#[path = "specs/mission/approval_denied.rs"]
mod mission_approval_denied;
#[path = "specs/mission/stale_context.rs"]
mod mission_stale_context;
#[path = "specs/mission/atomic_rollback.rs"]
mod mission_atomic_rollback;
#[path = "specs/mission/repair_budget.rs"]
mod mission_repair_budget;

// detector/
#[path = "specs/detector/priority.rs"]
mod detector_priority;

// replay/
#[path = "specs/replay/reduce_replay.rs"]
mod replay_reduce;

// checkpoint/
#[path = "specs/checkpoint/round_trip.rs"]
mod checkpoint_round_trip;
