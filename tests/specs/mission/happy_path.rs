//! Scenario: a one-step edit mission where everything goes right.

use crate::prelude::*;
use ordinex_core::{ApprovalDecision, EventPayload, TaskId};
use ordinex_engine::MissionStage;
use ordinex_storage::reduce;

#[tokio::test]
async fn happy_path_edit_produces_the_exact_log() {
    let ws = workspace(mission_with_steps(
        &["Update greeting in src/app.ts"],
        &["src/app.ts"],
    ));
    ws.write_file("src/app.ts", APP_TS);
    ws.llm
        .push_response(greeting_edit_response(APP_TS, "  return 'hi there';"));
    let resolver = ws.spawn_resolver(vec![ApprovalDecision::Approved]);

    let stage = ws.runner.run().await.unwrap();
    resolver.abort();
    assert_eq!(stage, MissionStage::MissionCompleted);

    assert_eq!(
        ws.kinds(),
        vec![
            "mission_started",
            "step_started",
            "stage_changed",
            "tool_start",
            "tool_end",
            "diff_proposed",
            "approval_requested",
            "approval_resolved",
            "checkpoint_created",
            "diff_applied",
            "step_completed",
            "mission_completed",
        ]
    );

    // The edit landed, atomically, with no temp leftovers
    assert_eq!(
        ws.read_file("src/app.ts"),
        "const greeting = () => {\n  return 'hi there';\n};\n"
    );
    assert!(!ws.dir.path().join("src/app.ts.ordinex_temp").exists());

    // stage_changed landed on the edit stage
    let events = ws.events();
    let stage_change = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::StageChanged { to, .. } => Some(*to),
            _ => None,
        })
        .unwrap();
    assert_eq!(stage_change, ordinex_core::Stage::Edit);

    // Every diff_applied has a preceding checkpoint_created and approved
    // approval_resolved naming the same diff
    let applied_diff = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::DiffApplied { diff_id, .. } => Some(diff_id.clone()),
            _ => None,
        })
        .unwrap();
    let applied_at = events
        .iter()
        .position(|e| matches!(e.payload, EventPayload::DiffApplied { .. }))
        .unwrap();
    let checkpoint_at = events
        .iter()
        .position(|e| matches!(&e.payload, EventPayload::CheckpointCreated { diff_id: Some(id), .. } if *id == applied_diff))
        .unwrap();
    let approval_at = events
        .iter()
        .position(|e| matches!(&e.payload, EventPayload::ApprovalResolved { decision: ApprovalDecision::Approved, diff_id: Some(id), .. } if *id == applied_diff))
        .unwrap();
    assert!(checkpoint_at < applied_at);
    assert!(approval_at < checkpoint_at);

    // The proposal carries evidence (diff text + selection manifest)
    let proposed = events
        .iter()
        .find(|e| matches!(e.payload, EventPayload::DiffProposed { .. }))
        .unwrap();
    assert!(!proposed.evidence_ids.is_empty());

    // Folding the log lands the task on complete
    let states = reduce(&events);
    let state = states.get(&TaskId::new("task-1")).unwrap();
    assert_eq!(state.status, ordinex_core::TaskStatus::Complete);
}
