// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::EventFilter;
use ordinex_core::{EvidenceId, FakeClock, SequentialIdGen};

fn emitter() -> (tempfile::TempDir, Emitter<FakeClock, SequentialIdGen>) {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(EventBus::open(&dir.path().join("events.jsonl")).unwrap());
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let emitter = Emitter::new(
        bus,
        clock,
        SequentialIdGen::new("evt"),
        TaskId::new("task-1"),
        Mode::Mission,
    );
    (dir, emitter)
}

#[test]
fn emit_stamps_identity_and_context() {
    let (_dir, emitter) = emitter();
    emitter.set_stage(Stage::Edit);
    let event = emitter
        .emit(EventPayload::ToolStart {
            tool: "llm_edit".to_string(),
        })
        .unwrap();

    assert_eq!(event.event_id, "evt-1");
    assert_eq!(event.task_id, "task-1");
    assert_eq!(event.mode, Mode::Mission);
    assert_eq!(event.stage, Stage::Edit);
    assert_eq!(event.timestamp.timestamp_millis(), 1_000_000);
}

#[test]
fn emit_publishes_durably() {
    let (_dir, emitter) = emitter();
    emitter.emit(EventPayload::ExecutionResumed).unwrap();
    assert_eq!(emitter.bus().len(), 1);
}

#[test]
fn evidence_and_parent_attach() {
    let (_dir, emitter) = emitter();
    let first = emitter.emit(EventPayload::ExecutionResumed).unwrap();
    let second = emitter
        .emit_with_parent(EventPayload::StreamComplete, first.event_id.clone())
        .unwrap();
    assert_eq!(second.parent_event_id, Some(first.event_id));

    let third = emitter
        .emit_with_evidence(
            EventPayload::StreamComplete,
            vec![EvidenceId::new("ev-1")],
        )
        .unwrap();
    assert_eq!(third.evidence_ids, vec![EvidenceId::new("ev-1")]);
}

#[tokio::test]
async fn subscribers_see_emitted_events() {
    let (_dir, emitter) = emitter();
    let mut rx = emitter.bus().subscribe(EventFilter::task(TaskId::new("task-1")));
    emitter.emit(EventPayload::ExecutionResumed).unwrap();
    assert_eq!(rx.recv().await.unwrap().kind(), "execution_resumed");
}
