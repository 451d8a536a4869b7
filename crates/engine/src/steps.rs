// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step classification and per-stage execution.
//!
//! Classification is priority-ordered: edit keywords are checked first so
//! a word like "verification" inside an edit step can never route the
//! step to tests. The keyword lists are configuration, not code.

use crate::config::ClassifierConfig;
use crate::edit_tool::{EditConstraints, EditError, EditErrorType, EditOutcome};
use crate::error::EngineError;
use crate::mission::{Bounded, MissionRunner, MissionStage, StepOutcome};
use crate::selector::SelectionInput;
use ordinex_adapters::{CommandRunner, LlmAdapter, RetrievalAdapter, RetrievalBudgets};
use ordinex_core::{
    check_batch_staleness, Approval, ApprovalDecision, ApprovalId, ApprovalType, CheckpointId,
    CheckpointReason, Clock, DiffId, DiffProposal, EventPayload, EvidenceId, EvidenceKind,
    FailureReason, FileAction, IdGen, PlanStep, Stage,
};
use ordinex_storage::CreateOptions;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

/// Match a keyword against the word set of a description.
fn has_word(words: &[String], keyword: &str) -> bool {
    words.iter().any(|w| w == keyword)
}

/// True when the description looks like it names files or code roots.
fn mentions_paths(description: &str) -> bool {
    description.split_whitespace().any(|token| {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '.');
        token.contains('/')
            || [".ts", ".tsx", ".js", ".jsx", ".rs", ".py", ".css", ".json"]
                .iter()
                .any(|ext| token.ends_with(ext))
            || token == "src"
            || token == "lib"
            || token == "app"
    })
}

/// Map a plan step's description to a stage.
///
/// Priority: edit > retrieve > test (full phrases only) > repair > plan.
/// Default: paths or code roots in the text mean edit, otherwise retrieve.
pub fn classify_step(description: &str, config: &ClassifierConfig) -> Stage {
    let lowered = description.to_lowercase();
    let words: Vec<String> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect();

    if config.edit_keywords.iter().any(|k| has_word(&words, k)) {
        return Stage::Edit;
    }
    if config.retrieve_keywords.iter().any(|k| has_word(&words, k)) {
        return Stage::Retrieve;
    }
    if config.test_phrases.iter().any(|p| lowered.contains(p.as_str())) {
        return Stage::Test;
    }
    if config.repair_keywords.iter().any(|k| has_word(&words, k)) {
        return Stage::Repair;
    }
    if config.plan_keywords.iter().any(|k| has_word(&words, k)) {
        return Stage::Plan;
    }

    if mentions_paths(description) {
        Stage::Edit
    } else {
        Stage::Retrieve
    }
}

/// Extract pass/fail counts from test runner output.
///
/// Understands the common `N passed` / `N failing` phrasings; anything
/// unrecognised yields zeros and the exit code decides success.
pub(crate) fn parse_test_counts(output: &str) -> (i32, i32) {
    let mut pass = 0i32;
    let mut fail = 0i32;
    let tokens: Vec<&str> = output.split_whitespace().collect();
    for window in tokens.windows(2) {
        let [count, word] = window else { continue };
        let Ok(n) = count.trim_matches(|c: char| !c.is_ascii_digit()).parse::<i32>() else {
            continue;
        };
        let word = word.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase();
        match word.as_str() {
            "passed" | "passing" | "pass" => pass = pass.max(n),
            "failed" | "failing" | "fail" => fail = fail.max(n),
            _ => {}
        }
    }
    (pass, fail)
}

/// How a propose/approve/apply round ended.
pub(crate) enum ApplyFlow {
    Applied { paths: Vec<PathBuf> },
    Denied,
    Failed { reason: FailureReason, detail: String },
    Cancelled,
}

impl<L, R, T, C, G> MissionRunner<L, R, T, C, G>
where
    L: LlmAdapter,
    R: RetrievalAdapter,
    T: CommandRunner,
    C: Clock,
    G: IdGen,
{
    /// Run one plan step to completion or failure.
    ///
    /// Emits `step_started` up front; `step_completed` or `step_failed`
    /// according to the outcome. Exactly one `failure_detected` is
    /// emitted per failure, by the stage that observed it.
    pub(crate) async fn execute_step(&self, step: &PlanStep) -> Result<StepOutcome, EngineError> {
        let stage = classify_step(&step.description, &self.config.classifier);
        info!(step = %step.step_id, ?stage, "executing step");

        self.emitter.emit(EventPayload::StepStarted {
            step_id: step.step_id.clone(),
            description: step.description.clone(),
        })?;

        let outcome = match stage {
            Stage::Retrieve => self.run_retrieve_step(step).await?,
            Stage::Edit => self.run_edit_step(step).await?,
            Stage::Test => self.run_test_step(step).await?,
            Stage::Repair => self.run_repair_step(step).await?,
            Stage::Plan | Stage::None => StepOutcome::Completed,
        };

        if matches!(outcome, StepOutcome::Completed) {
            self.emitter.emit(EventPayload::StepCompleted {
                step_id: step.step_id.clone(),
            })?;
        }
        Ok(outcome)
    }

    // === retrieve ===

    async fn run_retrieve_step(&self, step: &PlanStep) -> Result<StepOutcome, EngineError> {
        self.change_stage(Stage::Retrieve)?;
        self.transition(MissionStage::RetrieveContext);

        self.emitter.emit(EventPayload::RetrievalStarted {
            query: step.description.clone(),
        })?;

        let budgets = RetrievalBudgets {
            max_results: self.config.selector.max_files * 4,
        };
        let result = self
            .bounded(
                self.config.timeouts.retrieval_secs,
                self.deps.retrieval.retrieve(&step.description, &budgets),
            )
            .await;

        match result {
            Bounded::Done(Ok(ranked)) => {
                let paths: Vec<PathBuf> = ranked.iter().map(|r| r.path.clone()).collect();
                *self.last_retrieval.lock() = ranked;
                self.emitter
                    .emit(EventPayload::RetrievalCompleted { paths })?;
                Ok(StepOutcome::Completed)
            }
            Bounded::Done(Err(e)) => {
                self.emitter.emit(EventPayload::RetrievalFailed {
                    error: e.to_string(),
                })?;
                self.emitter.emit(EventPayload::FailureDetected {
                    reason: FailureReason::IoError,
                    error_type: "retrieval_failed".to_string(),
                    details: e.to_string(),
                    checkpoint_id: None,
                    rollback: None,
                })?;
                Ok(StepOutcome::Failed {
                    reason: FailureReason::IoError,
                    detail: e.to_string(),
                })
            }
            Bounded::TimedOut { elapsed_ms } => self.stage_timed_out(Stage::Retrieve, elapsed_ms),
            Bounded::Stopped => Ok(StepOutcome::Cancelled),
        }
    }

    pub(crate) fn stage_timed_out(
        &self,
        stage: Stage,
        elapsed_ms: u64,
    ) -> Result<StepOutcome, EngineError> {
        self.emitter
            .emit(EventPayload::StageTimeout { stage, elapsed_ms })?;
        Ok(StepOutcome::Failed {
            reason: FailureReason::StageTimeout,
            detail: format!("{stage} stage exceeded {elapsed_ms} ms"),
        })
    }

    // === edit ===

    async fn run_edit_step(&self, step: &PlanStep) -> Result<StepOutcome, EngineError> {
        self.change_stage(Stage::Edit)?;
        self.transition(MissionStage::ProposePatchPlan);

        let input = SelectionInput {
            retrieval: self.last_retrieval.lock().clone(),
            open_editors: Vec::new(),
            anchors: self.mission.scope.likely_files.clone(),
        };
        let excerpts =
            self.selector
                .select(&self.workspace_root, &input, &step.description, &self.guard)?;
        if excerpts.is_empty() {
            self.emitter.emit(EventPayload::FailureDetected {
                reason: FailureReason::ValidationError,
                error_type: "no_context".to_string(),
                details: "excerpt selection produced no files".to_string(),
                checkpoint_id: None,
                rollback: None,
            })?;
            return Ok(StepOutcome::Failed {
                reason: FailureReason::ValidationError,
                detail: "excerpt selection produced no files".to_string(),
            });
        }

        // The selection manifest travels as evidence on the proposal, so
        // the happy-path log stays minimal.
        let manifest = serde_json::to_vec_pretty(&excerpts).unwrap_or_default();
        let manifest_id = EvidenceId::new(self.id_gen.next());
        self.evidence
            .write(&manifest_id, EvidenceKind::ContextSelection, &manifest)?;

        self.emitter.emit(EventPayload::ToolStart {
            tool: "llm_edit".to_string(),
        })?;
        let constraints = EditConstraints {
            max_files: self.config.edit.max_files,
            max_changed_lines: self.config.edit.max_changed_lines,
            allowed_paths: None,
            allow_creates: true,
            allow_deletes: false,
        };
        let generated = self
            .bounded(
                self.config.timeouts.diff_generation_secs,
                self.edit_tool.generate(&step.description, &excerpts, &constraints),
            )
            .await;
        let generated = match generated {
            Bounded::Done(result) => {
                self.emitter.emit(EventPayload::ToolEnd {
                    tool: "llm_edit".to_string(),
                    ok: result.is_ok(),
                })?;
                result
            }
            Bounded::TimedOut { elapsed_ms } => {
                self.emitter.emit(EventPayload::ToolEnd {
                    tool: "llm_edit".to_string(),
                    ok: false,
                })?;
                return self.stage_timed_out(Stage::Edit, elapsed_ms);
            }
            Bounded::Stopped => return Ok(StepOutcome::Cancelled),
        };

        let outcome = match generated {
            Ok(outcome) => outcome,
            Err(e) => return self.edit_failed(e),
        };

        self.transition(MissionStage::ProposeDiff);
        match self.propose_and_apply(&outcome, vec![manifest_id]).await? {
            ApplyFlow::Applied { .. } => Ok(StepOutcome::Completed),
            ApplyFlow::Denied => Ok(StepOutcome::Denied {
                reason: FailureReason::DiffRejected,
            }),
            ApplyFlow::Failed { reason, detail } => Ok(StepOutcome::Failed { reason, detail }),
            ApplyFlow::Cancelled => Ok(StepOutcome::Cancelled),
        }
    }

    fn edit_failed(&self, e: EditError) -> Result<StepOutcome, EngineError> {
        let reason = match e.error_type {
            EditErrorType::ValidationError => FailureReason::ValidationError,
            EditErrorType::ParseError => FailureReason::ParseError,
            EditErrorType::SchemaError => FailureReason::SchemaError,
            EditErrorType::Truncation => FailureReason::Truncation,
            EditErrorType::SplitFailed => FailureReason::SplitFailed,
            EditErrorType::Unknown => FailureReason::ExecutionException,
        };
        self.emitter.emit(EventPayload::FailureDetected {
            reason,
            error_type: format!("{:?}", e.error_type),
            details: e.to_string(),
            checkpoint_id: None,
            rollback: None,
        })?;
        Ok(StepOutcome::Failed {
            reason,
            detail: e.to_string(),
        })
    }

    /// Shared propose → approve → checkpoint → apply pipeline.
    pub(crate) async fn propose_and_apply(
        &self,
        outcome: &EditOutcome,
        mut extra_evidence: Vec<EvidenceId>,
    ) -> Result<ApplyFlow, EngineError> {
        // Scope fences are enforced at the point of access, for every
        // touched path.
        for file in &outcome.files {
            if let Some(path) = file.path() {
                if self.guard.is_denied(path) {
                    let detail = format!("path denied by scope fence: {}", path.display());
                    self.emitter.emit(EventPayload::FailureDetected {
                        reason: FailureReason::ValidationError,
                        error_type: "scope_fence".to_string(),
                        details: detail.clone(),
                        checkpoint_id: None,
                        rollback: None,
                    })?;
                    return Ok(ApplyFlow::Failed {
                        reason: FailureReason::ValidationError,
                        detail,
                    });
                }
            }
        }

        // New files go through the create-path fence, with scope
        // expansion as the recovery path for allowlist misses.
        for file in outcome.files.iter().filter(|f| f.action() == FileAction::Create) {
            let Some(path) = file.path() else { continue };
            let decision = self.fence.check(path, file.lines_added() as usize);
            if decision.allowed {
                continue;
            }
            if !decision.requires_scope_expansion {
                let detail = format!(
                    "creation of {} rejected by {}",
                    path.display(),
                    decision.matched_rule.as_deref().unwrap_or("fence"),
                );
                self.emitter.emit(EventPayload::FailureDetected {
                    reason: FailureReason::ValidationError,
                    error_type: "create_fence".to_string(),
                    details: detail.clone(),
                    checkpoint_id: None,
                    rollback: None,
                })?;
                return Ok(ApplyFlow::Failed {
                    reason: FailureReason::ValidationError,
                    detail,
                });
            }
            match self.request_scope_expansion(path).await? {
                ApprovalDecision::Approved => {}
                ApprovalDecision::Denied => return Ok(ApplyFlow::Denied),
                ApprovalDecision::Cancelled => return Ok(ApplyFlow::Cancelled),
            }
        }

        let proposal = DiffProposal {
            diff_id: DiffId::new(self.id_gen.next()),
            touched_files: outcome.output.touched_files.clone(),
            unified_diff: outcome.output.unified_diff.clone(),
        };

        let diff_evidence_id = EvidenceId::new(self.id_gen.next());
        self.evidence.write(
            &diff_evidence_id,
            EvidenceKind::Diff,
            proposal.unified_diff.as_bytes(),
        )?;
        let mut evidence_ids = vec![diff_evidence_id];
        evidence_ids.append(&mut extra_evidence);
        self.emitter.emit_with_evidence(
            EventPayload::DiffProposed {
                diff_id: proposal.diff_id.clone(),
                touched_files: proposal.touched_files.clone(),
            },
            evidence_ids,
        )?;

        // Approval gate.
        self.transition(MissionStage::AwaitApplyApproval);
        let approval = Approval::new(
            ApprovalId::new(self.id_gen.next()),
            ApprovalType::ApplyDiff,
            format!("Apply diff touching {} file(s)", proposal.touched_files.len()),
            self.clock.epoch_ms(),
        )
        .with_diff(proposal.diff_id.clone());
        match self.approvals.request(&self.emitter, approval).await? {
            ApprovalDecision::Approved => {}
            ApprovalDecision::Denied => return Ok(ApplyFlow::Denied),
            ApprovalDecision::Cancelled => return Ok(ApplyFlow::Cancelled),
        }

        // Staleness pre-check before any checkpoint work; the applier
        // re-checks immediately before commit.
        let expected = proposal.expected_shas();
        let mut current = HashMap::new();
        for path in expected.keys() {
            if let Ok(bytes) = std::fs::read(self.workspace_root.join(path)) {
                current.insert(path.clone(), bytes);
            }
        }
        let stale = check_batch_staleness(&current, &expected);
        if !stale.is_empty() {
            return self.stale_context_failed(stale);
        }

        // Checkpoint before touching anything.
        self.transition(MissionStage::ApplyDiff);
        let checkpoint_id = CheckpointId::new(self.id_gen.next());
        {
            let mut checkpoints = self.checkpoints.lock();
            checkpoints.create(
                checkpoint_id.clone(),
                CreateOptions::auto(CheckpointReason::PreEdit, proposal.paths()),
            )?;
        }
        self.emitter.emit(EventPayload::CheckpointCreated {
            checkpoint_id: checkpoint_id.clone(),
            reason: CheckpointReason::PreEdit,
            diff_id: Some(proposal.diff_id.clone()),
        })?;

        // Commit.
        let applied = {
            let checkpoints = self.checkpoints.lock();
            self.applier
                .apply(&proposal, &outcome.files, &checkpoints, &checkpoint_id)
        };
        match applied {
            Ok(paths) => {
                self.emitter.emit(EventPayload::DiffApplied {
                    diff_id: proposal.diff_id.clone(),
                    files: paths.clone(),
                })?;
                Ok(ApplyFlow::Applied { paths })
            }
            Err(crate::applier::ApplyError::StaleContext(stale)) => {
                self.stale_context_failed(stale)
            }
            Err(crate::applier::ApplyError::HunkMismatch(e)) => {
                let detail = e.to_string();
                self.emitter.emit(EventPayload::FailureDetected {
                    reason: FailureReason::HunkMismatch,
                    error_type: "hunk_mismatch".to_string(),
                    details: detail.clone(),
                    checkpoint_id: Some(checkpoint_id),
                    rollback: None,
                })?;
                Ok(ApplyFlow::Failed {
                    reason: FailureReason::HunkMismatch,
                    detail,
                })
            }
            Err(crate::applier::ApplyError::ApplyFailed { path, rollback }) => {
                let detail = format!("rename failed on {}", path.display());
                self.emitter.emit(EventPayload::FailureDetected {
                    reason: FailureReason::ApplyFailed,
                    error_type: "apply_failed".to_string(),
                    details: detail.clone(),
                    checkpoint_id: Some(checkpoint_id),
                    rollback: Some(rollback),
                })?;
                Ok(ApplyFlow::Failed {
                    reason: FailureReason::ApplyFailed,
                    detail,
                })
            }
            Err(e) => {
                let reason = match &e {
                    crate::applier::ApplyError::Io { .. } => FailureReason::IoError,
                    _ => FailureReason::ExecutionException,
                };
                let detail = e.to_string();
                self.emitter.emit(EventPayload::FailureDetected {
                    reason,
                    error_type: "apply_pipeline".to_string(),
                    details: detail.clone(),
                    checkpoint_id: Some(checkpoint_id),
                    rollback: None,
                })?;
                Ok(ApplyFlow::Failed { reason, detail })
            }
        }
    }

    fn stale_context_failed(
        &self,
        stale: Vec<ordinex_core::StaleFile>,
    ) -> Result<ApplyFlow, EngineError> {
        let detail = format!(
            "{} file(s) changed since excerpt selection; re-read and try again",
            stale.len()
        );
        self.emitter
            .emit(EventPayload::StaleContextDetected { files: stale })?;
        self.emitter.emit(EventPayload::FailureDetected {
            reason: FailureReason::StaleContext,
            error_type: "stale_context".to_string(),
            details: detail.clone(),
            checkpoint_id: None,
            rollback: None,
        })?;
        Ok(ApplyFlow::Failed {
            reason: FailureReason::StaleContext,
            detail,
        })
    }

    // === test ===

    /// The command verifying this mission, from the plan's verification
    /// block when present.
    pub(crate) fn test_command(&self) -> String {
        self.mission
            .verification
            .as_ref()
            .and_then(|v| v.suggested_commands.first().cloned())
            .unwrap_or_else(|| "npm test".to_string())
    }

    async fn run_test_step(&self, step: &PlanStep) -> Result<StepOutcome, EngineError> {
        self.change_stage(Stage::Test)?;
        let command = self.test_command();

        match self.run_tests_gated(&command).await? {
            TestFlow::Passed => Ok(StepOutcome::Completed),
            TestFlow::Failed { signature, output } => {
                self.run_repair_loop(step, &command, signature, output).await
            }
            TestFlow::Denied => Ok(StepOutcome::Denied {
                reason: FailureReason::ApprovalDenied,
            }),
            TestFlow::TimedOut { elapsed_ms } => self.stage_timed_out(Stage::Test, elapsed_ms),
            TestFlow::Cancelled => Ok(StepOutcome::Cancelled),
        }
    }

    /// Approval-gated test execution. The first use of a literal command
    /// needs approval; re-running the same command auto-approves.
    pub(crate) async fn run_tests_gated(&self, command: &str) -> Result<TestFlow, EngineError> {
        let needs_approval = !self.approved_commands.lock().contains(command);
        if needs_approval {
            self.transition(MissionStage::AwaitTestApproval);
            let approval = Approval::new(
                ApprovalId::new(self.id_gen.next()),
                ApprovalType::TestCommand,
                format!("Run test command: {command}"),
                self.clock.epoch_ms(),
            )
            .with_context("command", command);
            match self.approvals.request(&self.emitter, approval).await? {
                ApprovalDecision::Approved => {
                    self.approved_commands.lock().insert(command.to_string());
                }
                ApprovalDecision::Denied => return Ok(TestFlow::Denied),
                ApprovalDecision::Cancelled => return Ok(TestFlow::Cancelled),
            }
        }

        self.transition(MissionStage::RunTests);
        self.emitter.emit(EventPayload::TestStarted {
            command: command.to_string(),
        })?;

        let result = self
            .bounded(
                self.config.timeouts.test_secs,
                self.deps.tests.run(command, &self.workspace_root),
            )
            .await;
        let output = match result {
            Bounded::Done(Ok(output)) => output,
            Bounded::Done(Err(e)) => {
                self.emitter.emit(EventPayload::TestFailed {
                    command: command.to_string(),
                    pass_count: 0,
                    fail_count: 0,
                    failure_signature: Some(e.to_string()),
                })?;
                return Ok(TestFlow::Failed {
                    signature: Some(e.to_string()),
                    output: String::new(),
                });
            }
            Bounded::TimedOut { elapsed_ms } => return Ok(TestFlow::TimedOut { elapsed_ms }),
            Bounded::Stopped => return Ok(TestFlow::Cancelled),
        };

        let combined = format!("{}\n{}", output.stdout, output.stderr);
        let evidence_id = EvidenceId::new(self.id_gen.next());
        self.evidence
            .write(&evidence_id, EvidenceKind::TestOutput, combined.as_bytes())?;

        let (pass_count, fail_count) = parse_test_counts(&combined);
        if output.success() {
            self.emitter.emit_with_evidence(
                EventPayload::TestCompleted {
                    command: command.to_string(),
                    pass_count,
                    fail_count,
                },
                vec![evidence_id],
            )?;
            Ok(TestFlow::Passed)
        } else {
            let signature = crate::repair::extract_failure_signature(&combined);
            self.emitter.emit_with_evidence(
                EventPayload::TestFailed {
                    command: command.to_string(),
                    pass_count,
                    fail_count,
                    failure_signature: signature.clone(),
                },
                vec![evidence_id],
            )?;
            Ok(TestFlow::Failed {
                signature,
                output: combined,
            })
        }
    }

    async fn run_repair_step(&self, step: &PlanStep) -> Result<StepOutcome, EngineError> {
        // A repair-classified plan step starts from a test run to find
        // out what is actually broken.
        self.change_stage(Stage::Test)?;
        let command = self.test_command();
        match self.run_tests_gated(&command).await? {
            TestFlow::Passed => Ok(StepOutcome::Completed),
            TestFlow::Failed { signature, output } => {
                self.run_repair_loop(step, &command, signature, output).await
            }
            TestFlow::Denied => Ok(StepOutcome::Denied {
                reason: FailureReason::ApprovalDenied,
            }),
            TestFlow::TimedOut { elapsed_ms } => self.stage_timed_out(Stage::Test, elapsed_ms),
            TestFlow::Cancelled => Ok(StepOutcome::Cancelled),
        }
    }

    async fn request_scope_expansion(
        &self,
        path: &std::path::Path,
    ) -> Result<ApprovalDecision, EngineError> {
        let pattern = path.display().to_string();
        let approval_id = ApprovalId::new(self.id_gen.next());
        self.emitter.emit(EventPayload::ScopeExpansionRequested {
            approval_id: approval_id.clone(),
            paths: vec![pattern.clone()],
        })?;
        let approval = Approval::new(
            approval_id.clone(),
            ApprovalType::ScopeExpansion,
            format!("Allow creation of {pattern}"),
            self.clock.epoch_ms(),
        );
        let decision = self.approvals.request(&self.emitter, approval).await?;
        self.emitter.emit(EventPayload::ScopeExpansionResolved {
            approval_id,
            approved: decision.is_approved(),
        })?;
        if decision.is_approved() {
            self.fence.expand_allowlist(&[pattern])?;
        }
        Ok(decision)
    }
}

/// How a gated test run ended.
pub(crate) enum TestFlow {
    Passed,
    Failed {
        signature: Option<String>,
        output: String,
    },
    Denied,
    TimedOut { elapsed_ms: u64 },
    Cancelled,
}

#[cfg(test)]
#[path = "steps_tests.rs"]
mod tests;
