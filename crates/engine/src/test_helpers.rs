// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::bus::EventBus;
use crate::config::EngineConfig;
use crate::mission::{MissionDeps, MissionRunner};
use ordinex_adapters::{FakeCommandRunner, FakeLlmAdapter, FakeRetrievalAdapter};
use ordinex_core::test_support::single_step_mission;
use ordinex_core::{
    base_sha, ApprovalDecision, EventPayload, FakeClock, Mission, SequentialIdGen, TaskId,
};
use std::sync::Arc;

pub(crate) type TestRunner = MissionRunner<
    FakeLlmAdapter,
    FakeRetrievalAdapter,
    FakeCommandRunner,
    FakeClock,
    SequentialIdGen,
>;

pub(crate) struct Harness {
    pub dir: tempfile::TempDir,
    pub bus: Arc<EventBus>,
    pub llm: FakeLlmAdapter,
    pub retrieval: FakeRetrievalAdapter,
    pub tests: FakeCommandRunner,
    pub clock: FakeClock,
    pub runner: Arc<TestRunner>,
}

pub(crate) fn harness_with_config(mission: Mission, config: EngineConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(EventBus::open(&dir.path().join(".ordinex/events.jsonl")).unwrap());
    let llm = FakeLlmAdapter::new();
    let retrieval = FakeRetrievalAdapter::new();
    let tests = FakeCommandRunner::new();
    let clock = FakeClock::new();

    let runner = MissionRunner::new(
        MissionDeps {
            llm: Arc::new(llm.clone()),
            retrieval: Arc::new(retrieval.clone()),
            tests: Arc::new(tests.clone()),
        },
        Arc::clone(&bus),
        dir.path(),
        mission,
        TaskId::new("task-1"),
        config,
        clock.clone(),
        SequentialIdGen::new("id"),
    )
    .unwrap();

    Harness {
        dir,
        bus,
        llm,
        retrieval,
        tests,
        clock,
        runner: Arc::new(runner),
    }
}

pub(crate) fn harness(mission: Mission) -> Harness {
    harness_with_config(mission, EngineConfig::default())
}

impl Harness {
    pub(crate) fn write_file(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub(crate) fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative)).unwrap()
    }

    /// Event kind sequence for the harness task.
    pub(crate) fn kinds(&self) -> Vec<&'static str> {
        self.bus
            .events_by_task(&TaskId::new("task-1"))
            .unwrap()
            .iter()
            .map(|e| e.kind())
            .collect()
    }

    /// Resolve approvals as they arrive, consuming one scripted decision
    /// per request (Approved once the script runs out).
    pub(crate) fn spawn_resolver(
        &self,
        decisions: Vec<ApprovalDecision>,
    ) -> tokio::task::JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        let mut rx = self
            .bus
            .subscribe(crate::bus::EventFilter::task(TaskId::new("task-1")));
        tokio::spawn(async move {
            let mut script = decisions.into_iter();
            while let Some(event) = rx.recv().await {
                if let EventPayload::ApprovalRequested { approval_id, .. } = &event.payload {
                    let decision = script.next().unwrap_or(ApprovalDecision::Approved);
                    runner
                        .approvals()
                        .resolve(runner.emitter(), approval_id, decision)
                        .unwrap();
                }
            }
        })
    }
}

/// A one-step edit mission over `src/app.ts`.
pub(crate) fn edit_mission() -> Mission {
    single_step_mission("m-1", "Update greeting in src/app.ts", &["src/app.ts"])
}

/// JSON edit response for a single-file update diff.
pub(crate) fn edit_response(path: &str, original: &str, diff: &str) -> String {
    serde_json::json!({
        "unified_diff": diff,
        "touched_files": [{
            "path": path,
            "action": "update",
            "base_sha": base_sha(original.as_bytes()),
        }],
        "confidence": 0.9,
        "notes": "",
        "validation_status": "ok",
        "complete": true,
    })
    .to_string()
}

/// Canonical one-hunk diff replacing `old` with `new` in a 1-line file
/// context block.
pub(crate) fn one_line_diff(path: &str, context: &str, old: &str, new: &str) -> String {
    format!(
        "--- a/{path}\n+++ b/{path}\n@@ -1,2 +1,2 @@\n {context}\n-{old}\n+{new}\n"
    )
}
