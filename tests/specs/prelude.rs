//! Shared fixtures for the behavioral specs.

#![allow(dead_code)]

use ordinex_adapters::{FakeCommandRunner, FakeLlmAdapter, FakeRetrievalAdapter};
use ordinex_core::{
    base_sha, ApprovalDecision, EventPayload, FakeClock, Mission, MissionId, MissionScope,
    PlanStep, SequentialIdGen, Stage, StepId, TaskId, VerificationPlan,
};
use ordinex_engine::{EngineConfig, EventBus, EventFilter, MissionDeps, MissionRunner};
use std::path::PathBuf;
use std::sync::Arc;

pub type SpecRunner = MissionRunner<
    FakeLlmAdapter,
    FakeRetrievalAdapter,
    FakeCommandRunner,
    FakeClock,
    SequentialIdGen,
>;

pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub bus: Arc<EventBus>,
    pub llm: FakeLlmAdapter,
    pub retrieval: FakeRetrievalAdapter,
    pub tests: FakeCommandRunner,
    pub runner: Arc<SpecRunner>,
}

pub fn mission_with_steps(steps: &[&str], likely: &[&str]) -> Mission {
    Mission {
        mission_id: MissionId::new("m-1"),
        title: steps.first().copied().unwrap_or("mission").to_string(),
        scope: MissionScope {
            likely_files: likely.iter().map(PathBuf::from).collect(),
            out_of_scope: Vec::new(),
        },
        included_steps: steps
            .iter()
            .enumerate()
            .map(|(i, description)| PlanStep {
                step_id: StepId::new(format!("step-{}", i + 1)),
                description: description.to_string(),
                stage: Stage::None,
            })
            .collect(),
        verification: Some(VerificationPlan {
            suggested_commands: vec!["npm test".to_string()],
            acceptance_criteria: vec![],
        }),
    }
}

pub fn workspace(mission: Mission) -> Workspace {
    workspace_with_config(mission, EngineConfig::default())
}

pub fn workspace_with_config(mission: Mission, config: EngineConfig) -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(EventBus::open(&dir.path().join(".ordinex/events.jsonl")).unwrap());
    let llm = FakeLlmAdapter::new();
    let retrieval = FakeRetrievalAdapter::new();
    let tests = FakeCommandRunner::new();

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
        FakeClock::new(),
        SequentialIdGen::new("id"),
    )
    .unwrap();

    Workspace {
        dir,
        bus,
        llm,
        retrieval,
        tests,
        runner: Arc::new(runner),
    }
}

impl Workspace {
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative)).unwrap()
    }

    pub fn events(&self) -> Vec<ordinex_core::Event> {
        self.bus.events_by_task(&TaskId::new("task-1")).unwrap()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.kind()).collect()
    }

    /// Resolve approvals as they arrive, one scripted decision each
    /// (Approved once the script runs out).
    pub fn spawn_resolver(
        &self,
        decisions: Vec<ApprovalDecision>,
    ) -> tokio::task::JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        let mut rx = self.bus.subscribe(EventFilter::task(TaskId::new("task-1")));
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

pub const APP_TS: &str = "const greeting = () => {\n  return 'hello';\n};\n";

/// Model response for a one-file update of `path`, replacing `old` with
/// `new` under `context`.
pub fn edit_response(path: &str, original: &str, context: &str, old: &str, new: &str) -> String {
    let diff = format!("--- a/{path}\n+++ b/{path}\n@@ -1,2 +1,2 @@\n {context}\n-{old}\n+{new}\n");
    serde_json::json!({
        "unified_diff": diff,
        "touched_files": [{
            "path": path,
            "action": "update",
            "base_sha": base_sha(original.as_bytes()),
        }],
        "confidence": 0.9,
        "validation_status": "ok",
        "complete": true,
    })
    .to_string()
}

pub fn greeting_edit_response(original: &str, new_line: &str) -> String {
    edit_response(
        "src/app.ts",
        original,
        "const greeting = () => {",
        "  return 'hello';",
        new_line,
    )
}
