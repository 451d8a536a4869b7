//! Scenario: the user declines the proposed diff.

use crate::prelude::*;
use ordinex_core::{ApprovalDecision, EventPayload, FailureReason};
use ordinex_engine::MissionStage;

#[tokio::test]
async fn denied_diff_pauses_without_touching_the_workspace() {
    let ws = workspace(mission_with_steps(
        &["Update greeting in src/app.ts"],
        &["src/app.ts"],
    ));
    ws.write_file("src/app.ts", APP_TS);
    ws.llm
        .push_response(greeting_edit_response(APP_TS, "  return 'nope';"));
    let resolver = ws.spawn_resolver(vec![ApprovalDecision::Denied]);

    let stage = ws.runner.run().await.unwrap();
    resolver.abort();
    assert_eq!(stage, MissionStage::MissionPaused);

    let kinds = ws.kinds();
    let tail: Vec<_> = kinds[kinds.len() - 4..].to_vec();
    assert_eq!(
        tail,
        vec![
            "approval_requested",
            "approval_resolved",
            "execution_paused",
            "mission_paused",
        ]
    );

    // No checkpoint, no file touched, no step_failed
    assert!(!kinds.contains(&"checkpoint_created"));
    assert!(!kinds.contains(&"step_failed"));
    assert_eq!(ws.read_file("src/app.ts"), APP_TS);

    let pause = ws
        .events()
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::ExecutionPaused { reason, .. } => Some(*reason),
            _ => None,
        })
        .unwrap();
    assert_eq!(pause, FailureReason::DiffRejected);
}
