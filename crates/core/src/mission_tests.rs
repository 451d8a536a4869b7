// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn mission() -> Mission {
    Mission {
        mission_id: MissionId::new("m-1"),
        title: "Update greeting".to_string(),
        scope: MissionScope {
            likely_files: vec![PathBuf::from("src/app.ts")],
            out_of_scope: vec!["docs/**".to_string()],
        },
        included_steps: vec![
            PlanStep::new("step-1", "Update greeting in src/app.ts"),
            PlanStep::new("step-2", "Run test suite"),
        ],
        verification: Some(VerificationPlan {
            suggested_commands: vec!["npm test".to_string()],
            acceptance_criteria: vec!["greeting shows new copy".to_string()],
        }),
    }
}

#[test]
fn step_lookup_by_id() {
    let m = mission();
    assert!(m.step(&StepId::new("step-2")).is_some());
    assert!(m.step(&StepId::new("step-9")).is_none());
}

#[test]
fn new_step_has_no_stage_yet() {
    let step = PlanStep::new("s", "Analyze the config layer");
    assert_eq!(step.stage, Stage::None);
}

#[test]
fn serde_round_trip() {
    let m = mission();
    let json = serde_json::to_string(&m).unwrap();
    let back: Mission = serde_json::from_str(&json).unwrap();
    assert_eq!(back, m);
}

#[test]
fn empty_scope_serializes_compactly() {
    let m = Mission {
        mission_id: MissionId::new("m-2"),
        title: "t".to_string(),
        scope: MissionScope::default(),
        included_steps: vec![],
        verification: None,
    };
    let json = serde_json::to_value(&m).unwrap();
    assert!(json["scope"].get("likely_files").is_none());
    assert!(json.get("verification").is_none());
}
