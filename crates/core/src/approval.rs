// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval types for human-in-the-loop gating.

use crate::diff::DiffId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for an approval request.
    pub struct ApprovalId;
}

/// What kind of action the approval gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    Terminal,
    ApplyDiff,
    ScopeExpansion,
    PlanApproval,
    VisionConsent,
    TestCommand,
}

/// Outcome of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Denied,
    /// The task was stopped while the request was in flight.
    Cancelled,
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalDecision::Approved)
    }
}

/// An approval awaiting (or resolved by) the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub approval_type: ApprovalType,
    pub description: String,
    /// Contextual metadata shown alongside the prompt (command text,
    /// file lists, and similar).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
    /// Diff this approval gates, when it gates one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_id: Option<DiffId>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ApprovalDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
}

impl Approval {
    pub fn new(
        id: ApprovalId,
        approval_type: ApprovalType,
        description: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            approval_type,
            description: description.into(),
            context: HashMap::new(),
            diff_id: None,
            created_at_ms,
            decision: None,
            resolved_at_ms: None,
        }
    }

    pub fn with_diff(mut self, diff_id: DiffId) -> Self {
        self.diff_id = Some(diff_id);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.decision.is_some()
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
