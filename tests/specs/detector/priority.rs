//! Scenario: stuck outranks scope creep when both patterns are present.

use ordinex_core::{IterationOutcome, LoopType};
use ordinex_engine::detect_loop;
use std::collections::BTreeSet;
use std::path::PathBuf;

fn outcome(iteration: u32, signature: &str, file: &str) -> IterationOutcome {
    IterationOutcome {
        iteration,
        success: false,
        failure_signature: Some(signature.to_string()),
        test_pass_count: 4,
        test_fail_count: 1,
        files_touched: vec![PathBuf::from(file)],
    }
}

#[test]
fn stuck_wins_over_scope_creep() {
    // Signatures [E_A, E_A, E_A]; files drift outside the declared scope
    let history = vec![
        outcome(1, "E_A", "src/a.ts"),
        outcome(2, "E_A", "src/b.ts"),
        outcome(3, "E_A", "src/c.ts"),
    ];
    let scope: BTreeSet<PathBuf> = [PathBuf::from("src/a.ts")].into();

    let verdict = detect_loop(&history, &scope);
    assert!(verdict.detected);
    assert_eq!(verdict.loop_type, Some(LoopType::Stuck));
    assert_eq!(verdict.evidence["occurrences"], 3);
}

#[test]
fn scope_creep_fires_once_stuck_is_out_of_the_picture() {
    let history = vec![
        outcome(1, "E_A", "src/a.ts"),
        outcome(2, "E_B", "src/b.ts"),
        outcome(3, "E_C", "src/c.ts"),
    ];
    let scope: BTreeSet<PathBuf> = [PathBuf::from("src/a.ts")].into();

    let verdict = detect_loop(&history, &scope);
    assert_eq!(verdict.loop_type, Some(LoopType::ScopeCreep));
    // Aggregate union across the whole history, reported sorted
    assert_eq!(verdict.evidence["files_outside_scope"][0], "src/b.ts");
    assert_eq!(verdict.evidence["files_outside_scope"][1], "src/c.ts");
}

#[test]
fn short_histories_never_fire_positional_detectors() {
    let history = vec![outcome(1, "E_A", "src/a.ts"), outcome(2, "E_A", "src/a.ts")];
    let scope: BTreeSet<PathBuf> = [PathBuf::from("src/a.ts")].into();
    let verdict = detect_loop(&history, &scope);
    // Not stuck (needs 3), not oscillating (needs 4), not creep (in scope)
    assert!(!verdict.detected);
}
