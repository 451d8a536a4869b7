// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded repair loop: diagnose → propose → approve → apply → re-test.
//!
//! Diagnosis prefers a cheap model call and falls back to a deterministic
//! heuristic (error-line extraction plus path scanning) when the model is
//! unavailable or returns invalid JSON. The loop halts on budget
//! exhaustion or a loop-detector verdict; it never unpauses itself.

use crate::edit_tool::EditConstraints;
use crate::error::EngineError;
use crate::loop_detector::detect_loop;
use crate::mission::{Bounded, MissionRunner, MissionStage, StepOutcome};
use crate::selector::SelectionInput;
use crate::steps::{ApplyFlow, TestFlow};
use ordinex_adapters::{CommandRunner, LlmAdapter, LlmMessage, LlmRequest, RetrievalAdapter};
use ordinex_core::{
    Diagnosis, DiagnosisSource, EventPayload, EvidenceId, EvidenceKind, FailureReason,
    IterationOutcome, LoopType, PlanStep, Stage,
};
use ordinex_core::{Clock, IdGen};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// Extensions recognised when scanning output for file paths.
const CODE_EXTENSIONS: [&str; 10] = [
    ".ts", ".tsx", ".js", ".jsx", ".rs", ".py", ".css", ".json", ".go", ".java",
];

/// First error-looking line of test output, normalised.
pub(crate) fn extract_failure_signature(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| {
            let lowered = line.to_lowercase();
            lowered.contains("error") || line.contains("FAIL") || lowered.contains("assertion")
        })
        .map(|line| {
            let mut signature = line.to_string();
            signature.truncate(160);
            signature
        })
}

/// Workspace-looking paths mentioned in test output, deduplicated in
/// first-seen order.
pub(crate) fn extract_paths(output: &str) -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    let mut paths = Vec::new();
    for token in output.split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ',') {
        let token = token.trim_matches(|c: char| c == ':' || c == '\'' || c == '"' || c == '`');
        // Strip trailing :line:col position info
        let token = token.split(':').next().unwrap_or(token);
        if !CODE_EXTENSIONS.iter().any(|ext| token.ends_with(ext)) {
            continue;
        }
        if token.starts_with('/') || token.contains("://") {
            continue;
        }
        let path = PathBuf::from(token);
        if seen.insert(path.clone()) {
            paths.push(path);
        }
    }
    paths
}

/// Deterministic fallback diagnosis from raw test output.
pub(crate) fn heuristic_diagnosis(output: &str) -> Diagnosis {
    let signature = extract_failure_signature(output);
    let affected_files = extract_paths(output);
    Diagnosis {
        summary: signature
            .clone()
            .unwrap_or_else(|| "tests failed without a recognisable error line".to_string()),
        likely_causes: signature.into_iter().collect(),
        root_cause_file: affected_files.first().cloned(),
        affected_files,
        suggested_fix: None,
        confidence: None,
    }
}

const DIAGNOSE_SYSTEM_PROMPT: &str = "\
You diagnose a failing test run. Respond with JSON only:
{\"summary\": \"...\", \"likely_causes\": [..], \"affected_files\": [..],
 \"root_cause_file\": \"...\", \"suggested_fix\": \"...\", \"confidence\": 0.0}";

impl<L, R, T, C, G> MissionRunner<L, R, T, C, G>
where
    L: LlmAdapter,
    R: RetrievalAdapter,
    T: CommandRunner,
    C: Clock,
    G: IdGen,
{
    /// Diagnose a failure, preferring the model, falling back to the
    /// heuristic. Always returns a diagnosis.
    async fn diagnose(&self, test_output: &str) -> (Diagnosis, DiagnosisSource) {
        let request = LlmRequest {
            messages: vec![
                LlmMessage::system(DIAGNOSE_SYSTEM_PROMPT),
                LlmMessage::user(test_output.to_string()),
            ],
            tools: vec![],
            max_tokens: 1024,
        };
        match self.deps.llm.send(request).await {
            Ok(response) => match serde_json::from_str::<Diagnosis>(&response.content) {
                Ok(diagnosis) => (diagnosis, DiagnosisSource::Llm),
                Err(e) => {
                    warn!(error = %e, "diagnosis JSON invalid, using heuristic");
                    (heuristic_diagnosis(test_output), DiagnosisSource::Heuristic)
                }
            },
            Err(e) => {
                warn!(error = %e, "diagnosis call failed, using heuristic");
                (heuristic_diagnosis(test_output), DiagnosisSource::Heuristic)
            }
        }
    }

    /// Run the bounded repair loop after a failing test run.
    pub(crate) async fn run_repair_loop(
        &self,
        step: &PlanStep,
        command: &str,
        initial_signature: Option<String>,
        initial_output: String,
    ) -> Result<StepOutcome, EngineError> {
        self.change_stage(Stage::Repair)?;
        self.transition(MissionStage::RepairLoop);
        info!(step = %step.step_id, %command, "entering repair loop");

        let max = self.config.budgets.repair_max_iterations;
        self.emitter
            .emit(EventPayload::AutonomyStarted { max_iterations: max })?;

        let scope: BTreeSet<PathBuf> = self.mission.scope.likely_files.iter().cloned().collect();
        let mut signature = initial_signature;
        let mut test_output = initial_output;

        for iteration in 1..=max {
            if self.is_stopped() {
                return Ok(StepOutcome::Cancelled);
            }
            let remaining = max - iteration;
            self.emitter.emit(EventPayload::RepairAttemptStarted {
                iteration,
                remaining,
            })?;
            self.emitter
                .emit(EventPayload::IterationStarted { iteration })?;

            // Diagnose.
            let (diagnosis, source) = self.diagnose(&test_output).await;
            let diagnosis_blob = serde_json::to_vec_pretty(&diagnosis).unwrap_or_default();
            let diagnosis_evidence = EvidenceId::new(self.id_gen.next());
            self.evidence
                .write(&diagnosis_evidence, EvidenceKind::Diagnosis, &diagnosis_blob)?;
            self.emitter.emit_with_evidence(
                EventPayload::RepairAttempted {
                    diagnosis: diagnosis.clone(),
                    source,
                },
                vec![diagnosis_evidence],
            )?;

            // Propose a fix targeting the diagnosed files.
            let anchors = if diagnosis.affected_files.is_empty() {
                self.mission.scope.likely_files.clone()
            } else {
                diagnosis.affected_files.clone()
            };
            let input = SelectionInput {
                retrieval: Vec::new(),
                open_editors: Vec::new(),
                anchors,
            };
            let fix_prompt = format!(
                "Fix this failure: {}\nSuggested approach: {}",
                diagnosis.summary,
                diagnosis.suggested_fix.as_deref().unwrap_or("none"),
            );
            let excerpts =
                self.selector
                    .select(&self.workspace_root, &input, &fix_prompt, &self.guard)?;
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
                    self.edit_tool.generate(&fix_prompt, &excerpts, &constraints),
                )
                .await;

            let mut files_touched: Vec<PathBuf> = Vec::new();
            let mut fix_applied = false;
            match generated {
                Bounded::Done(Ok(outcome)) => match self.propose_and_apply(&outcome, vec![]).await? {
                    ApplyFlow::Applied { paths, .. } => {
                        files_touched = paths;
                        fix_applied = true;
                    }
                    ApplyFlow::Denied => {
                        return Ok(StepOutcome::Denied {
                            reason: FailureReason::DiffRejected,
                        })
                    }
                    ApplyFlow::Failed { reason, detail } => {
                        // Stale context and apply failures abort the loop;
                        // the workspace needs the user's attention.
                        if matches!(
                            reason,
                            FailureReason::StaleContext | FailureReason::ApplyFailed
                        ) {
                            return Ok(StepOutcome::Failed { reason, detail });
                        }
                        warn!(%reason, "fix proposal failed; counting a failed iteration");
                    }
                    ApplyFlow::Cancelled => return Ok(StepOutcome::Cancelled),
                },
                Bounded::Done(Err(e)) => {
                    // Diff generation failed; the structured diagnosis we
                    // already published stands in as the proposal.
                    warn!(error = %e, "fix generation failed, diagnosis document stands");
                }
                Bounded::TimedOut { elapsed_ms } => {
                    return self.stage_timed_out(Stage::Repair, elapsed_ms)
                }
                Bounded::Stopped => return Ok(StepOutcome::Cancelled),
            }

            // Re-test only when a fix landed; a failed proposal keeps the
            // previous failure as this iteration's outcome.
            if fix_applied {
                match self.run_tests_gated(command).await? {
                    TestFlow::Passed => {
                        self.emitter.emit(EventPayload::RepairAttemptCompleted {
                            iteration,
                            success: true,
                        })?;
                        self.emitter
                            .emit(EventPayload::IterationSucceeded { iteration })?;
                        self.emitter.emit(EventPayload::AutonomyCompleted)?;
                        info!(iteration, "repair loop converged");
                        return Ok(StepOutcome::Completed);
                    }
                    TestFlow::Failed {
                        signature: new_signature,
                        output,
                    } => {
                        signature = new_signature;
                        test_output = output;
                    }
                    TestFlow::Denied => {
                        return Ok(StepOutcome::Denied {
                            reason: FailureReason::ApprovalDenied,
                        })
                    }
                    TestFlow::TimedOut { elapsed_ms } => {
                        return self.stage_timed_out(Stage::Test, elapsed_ms)
                    }
                    TestFlow::Cancelled => return Ok(StepOutcome::Cancelled),
                }
            }

            self.emitter.emit(EventPayload::RepairAttemptCompleted {
                iteration,
                success: false,
            })?;
            self.emitter.emit(EventPayload::IterationFailed {
                iteration,
                failure_signature: signature.clone(),
            })?;

            let (pass_count, fail_count) = crate::steps::parse_test_counts(&test_output);
            self.history.lock().push(IterationOutcome {
                iteration,
                success: false,
                failure_signature: signature.clone(),
                test_pass_count: pass_count,
                test_fail_count: fail_count,
                files_touched,
            });

            // Consult the loop detector before burning another iteration.
            let verdict = {
                let history = self.history.lock();
                detect_loop(&history, &scope)
            };
            if verdict.detected {
                if verdict.loop_type == Some(LoopType::Stuck) {
                    if let Some(sig) = &signature {
                        self.emitter.emit(EventPayload::RepeatedFailureDetected {
                            signature: sig.clone(),
                            occurrences: verdict
                                .evidence
                                .get("occurrences")
                                .and_then(|v| v.as_u64())
                                .unwrap_or(0) as u32,
                        })?;
                    }
                }
                if let Some(loop_type) = verdict.loop_type {
                    self.emitter.emit(EventPayload::AutonomyLoopDetected {
                        loop_type,
                        evidence: verdict.evidence.clone(),
                    })?;
                }
                return Ok(StepOutcome::Failed {
                    reason: FailureReason::LoopDetected,
                    detail: verdict.recommendation,
                });
            }
        }

        self.emitter.emit(EventPayload::BudgetExhausted {
            budget: "repair".to_string(),
        })?;
        Ok(StepOutcome::Failed {
            reason: FailureReason::RepairBudgetExhausted,
            detail: format!("repair budget of {max} iterations exhausted"),
        })
    }
}

#[cfg(test)]
#[path = "repair_tests.rs"]
mod tests;
