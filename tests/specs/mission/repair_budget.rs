//! Scenario: a mission with repair budget 2 where both fixes still fail.

use crate::prelude::*;
use ordinex_core::{base_sha, EventPayload, FailureReason};
use ordinex_engine::{EngineConfig, MissionStage};

fn fix_response(original: &str, new_line: &str) -> String {
    edit_response(
        "src/app.ts",
        original,
        "const greeting = () => {",
        "  return 'hello';",
        new_line,
    )
}

fn diagnosis_json() -> String {
    serde_json::json!({
        "summary": "greeting broken",
        "likely_causes": ["bad return"],
        "affected_files": ["src/app.ts"],
        "root_cause_file": "src/app.ts",
        "suggested_fix": "fix the return value",
        "confidence": 0.6,
    })
    .to_string()
}

#[tokio::test]
async fn exhausted_repair_budget_pauses_the_mission() {
    let mut config = EngineConfig::default();
    config.budgets.repair_max_iterations = 2;
    let ws = workspace_with_config(
        mission_with_steps(&["Run the test suite"], &["src/app.ts"]),
        config,
    );
    ws.write_file("src/app.ts", APP_TS);

    // Initial run fails; each repair attempt diagnoses, fixes, re-tests
    // and fails again. The second fix targets the content left by the
    // first fix.
    ws.tests.push_output(1, "Tests: 1 failed, 4 passed\nerror E_A");

    ws.llm.push_response(diagnosis_json());
    ws.llm.push_response(fix_response(APP_TS, "  return 'try one';"));
    ws.tests.push_output(1, "Tests: 1 failed, 4 passed\nerror E_A");

    let after_first_fix = "const greeting = () => {\n  return 'try one';\n};\n";
    ws.llm.push_response(diagnosis_json());
    ws.llm.push_response(
        serde_json::json!({
            "unified_diff": format!(
                "--- a/src/app.ts\n+++ b/src/app.ts\n@@ -1,2 +1,2 @@\n const greeting = () => {{\n-  return 'try one';\n+  return 'try two';\n"
            ),
            "touched_files": [{
                "path": "src/app.ts",
                "action": "update",
                "base_sha": base_sha(after_first_fix.as_bytes()),
            }],
            "complete": true,
        })
        .to_string(),
    );
    ws.tests.push_output(1, "Tests: 1 failed, 4 passed\nerror E_A");

    let resolver = ws.spawn_resolver(vec![]);
    let stage = ws.runner.run().await.unwrap();
    resolver.abort();
    assert_eq!(stage, MissionStage::MissionPaused);

    let kinds = ws.kinds();
    // The expected shape: test fail, then two repair rounds each with
    // diagnosis, proposal, approval, checkpoint, apply, re-test.
    assert!(kinds.contains(&"test_failed"));
    assert_eq!(
        kinds.iter().filter(|k| **k == "repair_attempt_started").count(),
        2
    );
    assert_eq!(kinds.iter().filter(|k| **k == "repair_attempted").count(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == "diff_applied").count(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == "test_started").count(), 3);
    assert!(kinds.contains(&"budget_exhausted"));

    let events = ws.events();
    let remaining: Vec<u32> = events
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::RepairAttemptStarted { remaining, .. } => Some(*remaining),
            _ => None,
        })
        .collect();
    assert_eq!(remaining, vec![1, 0]);

    let pause = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::MissionPaused { reason, .. } => Some(*reason),
            _ => None,
        })
        .unwrap();
    assert_eq!(pause, FailureReason::RepairBudgetExhausted);

    // Both fixes landed on disk before the pause
    assert_eq!(
        ws.read_file("src/app.ts"),
        "const greeting = () => {\n  return 'try two';\n};\n"
    );
}
