//! Scenario: the user edits the file externally between proposal and
//! approval; the pre-apply sha check catches the drift.

use crate::prelude::*;
use ordinex_core::{ApprovalDecision, EventPayload, FailureReason, TaskId};
use ordinex_engine::MissionStage;
use std::sync::Arc;

#[tokio::test]
async fn external_modification_detected_before_any_write() {
    let ws = workspace(mission_with_steps(
        &["Update greeting in src/app.ts"],
        &["src/app.ts"],
    ));
    ws.write_file("src/app.ts", APP_TS);
    ws.llm
        .push_response(greeting_edit_response(APP_TS, "  return 'hi';"));

    // Approve, but sneak an external edit in first
    let runner = Arc::clone(&ws.runner);
    let root = ws.dir.path().to_path_buf();
    let mut rx = ws
        .bus
        .subscribe(ordinex_engine::EventFilter::task(TaskId::new("task-1")));
    let resolver = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let EventPayload::ApprovalRequested { approval_id, .. } = &event.payload {
                std::fs::write(root.join("src/app.ts"), "user typed here\n").unwrap();
                runner
                    .approvals()
                    .resolve(runner.emitter(), approval_id, ApprovalDecision::Approved)
                    .unwrap();
            }
        }
    });

    let stage = ws.runner.run().await.unwrap();
    resolver.abort();
    assert_eq!(stage, MissionStage::MissionPaused);

    let kinds = ws.kinds();
    let failure_at = kinds.iter().position(|k| *k == "failure_detected").unwrap();
    let step_failed_at = kinds.iter().position(|k| *k == "step_failed").unwrap();
    let paused_at = kinds.iter().position(|k| *k == "mission_paused").unwrap();
    assert!(failure_at < step_failed_at && step_failed_at < paused_at);

    let reason = ws
        .events()
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::FailureDetected { reason, .. } => Some(*reason),
            _ => None,
        })
        .unwrap();
    assert_eq!(reason, FailureReason::StaleContext);

    // No temps, no restore needed, external edit preserved
    assert!(!ws.dir.path().join("src/app.ts.ordinex_temp").exists());
    assert!(!kinds.contains(&"checkpoint_restored"));
    assert_eq!(ws.read_file("src/app.ts"), "user typed here\n");
}

#[tokio::test]
async fn stale_diff_id_is_released_for_retry() {
    // Drive the applier directly: a stale failure must release the
    // idempotency guard so the same diff id can be retried after a
    // re-read.
    use ordinex_core::{base_sha, CheckpointId, DiffId, DiffProposal, TouchedFile};
    use ordinex_engine::DiffApplier;
    use ordinex_storage::{CheckpointPolicy, CheckpointStore, CreateOptions};

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/app.ts"), "drifted\n").unwrap();

    let mut checkpoints = CheckpointStore::open_with_clock(
        dir.path(),
        dir.path().join(".ordinex/checkpoints"),
        CheckpointPolicy::default(),
        ordinex_core::FakeClock::new(),
    )
    .unwrap();
    let mut options = CreateOptions::auto(
        ordinex_core::CheckpointReason::PreEdit,
        vec!["src/app.ts".into()],
    );
    options.capture_source_control = false;
    checkpoints
        .create(CheckpointId::new("cp-1"), options)
        .unwrap();

    let diff_text = "--- a/src/app.ts\n+++ b/src/app.ts\n@@ -1,1 +1,1 @@\n-hello\n+hi\n";
    let files = ordinex_patch::parse(diff_text).unwrap();
    let proposal = DiffProposal {
        diff_id: DiffId::new("d-1"),
        touched_files: vec![TouchedFile {
            path: "src/app.ts".into(),
            action: ordinex_core::FileAction::Update,
            base_sha: Some(base_sha(b"hello\n")),
            new_content: None,
            lines_added: 1,
            lines_removed: 1,
        }],
        unified_diff: diff_text.to_string(),
    };

    let applier = DiffApplier::new(dir.path());
    assert!(applier
        .apply(&proposal, &files, &checkpoints, &CheckpointId::new("cp-1"))
        .is_err());
    assert!(!applier.was_applied(&DiffId::new("d-1")));

    // After a re-read the same id applies cleanly
    std::fs::write(dir.path().join("src/app.ts"), "hello\n").unwrap();
    applier
        .apply(&proposal, &files, &checkpoints, &CheckpointId::new("cp-1"))
        .unwrap();
    assert!(applier.was_applied(&DiffId::new("d-1")));
}
