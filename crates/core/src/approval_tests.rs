// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn pending() -> Approval {
    Approval::new(
        ApprovalId::new("a-1"),
        ApprovalType::ApplyDiff,
        "Apply 2-file diff",
        1_000,
    )
}

#[test]
fn new_approval_is_unresolved() {
    let approval = pending();
    assert!(!approval.is_resolved());
    assert!(approval.decision.is_none());
    assert!(approval.resolved_at_ms.is_none());
}

#[test]
fn builder_attaches_diff_and_context() {
    let approval = pending()
        .with_diff(DiffId::new("d-1"))
        .with_context("files", "src/app.ts");
    assert_eq!(approval.diff_id, Some(DiffId::new("d-1")));
    assert_eq!(approval.context.get("files").map(String::as_str), Some("src/app.ts"));
}

#[test]
fn decision_approved_check() {
    assert!(ApprovalDecision::Approved.is_approved());
    assert!(!ApprovalDecision::Denied.is_approved());
    assert!(!ApprovalDecision::Cancelled.is_approved());
}

#[yare::parameterized(
    terminal  = { ApprovalType::Terminal, "terminal" },
    diff      = { ApprovalType::ApplyDiff, "apply_diff" },
    scope     = { ApprovalType::ScopeExpansion, "scope_expansion" },
    plan      = { ApprovalType::PlanApproval, "plan_approval" },
    vision    = { ApprovalType::VisionConsent, "vision_consent" },
    test_cmd  = { ApprovalType::TestCommand, "test_command" },
)]
fn approval_type_wire_format(approval_type: ApprovalType, expected: &str) {
    assert_eq!(serde_json::to_value(approval_type).unwrap(), expected);
}

#[test]
fn serde_round_trip() {
    let approval = pending().with_diff(DiffId::new("d-9"));
    let json = serde_json::to_string(&approval).unwrap();
    let back: Approval = serde_json::from_str(&json).unwrap();
    assert_eq!(back, approval);
}
