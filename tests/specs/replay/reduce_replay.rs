//! Replay determinism: a run's log, re-read from disk and re-folded,
//! reproduces the same state byte for byte.

use crate::prelude::*;
use ordinex_core::{ApprovalDecision, TaskId};
use ordinex_storage::{reduce, EventLog};

#[tokio::test]
async fn refolding_the_durable_log_is_byte_identical() {
    let ws = workspace(mission_with_steps(
        &["Update greeting in src/app.ts"],
        &["src/app.ts"],
    ));
    ws.write_file("src/app.ts", APP_TS);
    ws.llm
        .push_response(greeting_edit_response(APP_TS, "  return 'hi';"));
    let resolver = ws.spawn_resolver(vec![ApprovalDecision::Approved]);
    ws.runner.run().await.unwrap();
    resolver.abort();

    // In-memory view of the events
    let live_events = ws.events();

    // Cold re-read from the durable log, as a fresh process would
    let log = EventLog::open(&ws.dir.path().join(".ordinex/events.jsonl")).unwrap();
    let replayed = log.events_by_task(&TaskId::new("task-1")).unwrap();
    assert_eq!(replayed, live_events);

    let live_state = serde_json::to_vec(
        reduce(&live_events).get(&TaskId::new("task-1")).unwrap(),
    )
    .unwrap();
    let replayed_state = serde_json::to_vec(
        reduce(&replayed).get(&TaskId::new("task-1")).unwrap(),
    )
    .unwrap();
    assert_eq!(live_state, replayed_state);
}

#[tokio::test]
async fn recovery_rebuilds_the_idempotency_guard_from_the_log() {
    use ordinex_core::{DiffId, EventPayload};
    use ordinex_engine::DiffApplier;

    let ws = workspace(mission_with_steps(
        &["Update greeting in src/app.ts"],
        &["src/app.ts"],
    ));
    ws.write_file("src/app.ts", APP_TS);
    ws.llm
        .push_response(greeting_edit_response(APP_TS, "  return 'hi';"));
    let resolver = ws.spawn_resolver(vec![]);
    ws.runner.run().await.unwrap();
    resolver.abort();

    // A recovered runner derives applied diff ids from diff_applied events
    let applied: Vec<DiffId> = ws
        .events()
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::DiffApplied { diff_id, .. } => Some(diff_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(applied.len(), 1);

    let recovered = DiffApplier::new(ws.dir.path());
    recovered.seed_applied(applied.clone());
    assert!(recovered.was_applied(&applied[0]));
}
