// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission runner: the top-level stage machine for an approved plan.
//!
//! One runner owns one mission on one task. All mutating operations run
//! on its single async context; suspension happens only at approvals,
//! provider calls, subprocesses, and filesystem I/O. Terminal stages have
//! no outgoing transitions.

use crate::applier::{CommitFs, DiffApplier, RealFs};
use crate::approvals::ApprovalManager;
use crate::bus::EventBus;
use crate::config::EngineConfig;
use crate::edit_tool::EditTool;
use crate::emitter::Emitter;
use crate::error::EngineError;
use crate::fence::CreatePathFence;
use crate::scope::ScopeGuard;
use crate::selector::ExcerptSelector;
use ordinex_adapters::{CommandRunner, LlmAdapter, RankedPath, RetrievalAdapter};
use ordinex_core::{
    Clock, Event, EventPayload, FailureReason, IdGen, IterationOutcome, Mission, Mode, Stage,
    TaskId,
};
use ordinex_storage::{CheckpointStore, EvidenceStore, OrdinexPaths};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Stages of the mission state machine (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionStage {
    RetrieveContext,
    ProposePatchPlan,
    ProposeDiff,
    AwaitApplyApproval,
    ApplyDiff,
    AwaitTestApproval,
    RunTests,
    RepairLoop,
    MissionCompleted,
    MissionPaused,
    MissionCancelled,
}

impl MissionStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MissionStage::MissionCompleted
                | MissionStage::MissionPaused
                | MissionStage::MissionCancelled
        )
    }
}

/// Cooperative stop signal shared with the frontend.
#[derive(Default)]
pub struct StopHandle {
    flag: AtomicBool,
    notify: Notify,
}

impl StopHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves when (or as soon as) the handle is stopped.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// External collaborators a mission needs.
pub struct MissionDeps<L, R, T> {
    pub llm: Arc<L>,
    pub retrieval: Arc<R>,
    pub tests: Arc<T>,
}

/// How a bounded await ended.
pub(crate) enum Bounded<T> {
    Done(T),
    TimedOut { elapsed_ms: u64 },
    Stopped,
}

/// How a step ended, for the runner's control flow.
#[derive(Debug)]
pub(crate) enum StepOutcome {
    Completed,
    /// A failure was detected (the stage already emitted its
    /// `failure_detected`); the wrapper emits `step_failed`.
    Failed {
        reason: FailureReason,
        detail: String,
    },
    /// The user declined an approval; pauses without `step_failed`.
    Denied { reason: FailureReason },
    Cancelled,
}

/// State recovered from the event log after a crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredMission {
    pub stage: MissionStage,
    pub repair_remaining: u32,
}

/// Reconstruct mission state from events.
///
/// A log ending in a terminal event recovers to that terminal; anything
/// else recovers to `MissionPaused` — execution never silently resumes.
pub fn recover(events: &[Event], max_repair_iterations: u32) -> RecoveredMission {
    let stage = match events.last().map(|e| &e.payload) {
        Some(EventPayload::MissionCompleted { .. }) => MissionStage::MissionCompleted,
        Some(EventPayload::MissionCancelled { .. }) => MissionStage::MissionCancelled,
        _ => MissionStage::MissionPaused,
    };
    let attempts = events
        .iter()
        .filter(|e| matches!(e.payload, EventPayload::RepairAttemptStarted { .. }))
        .count() as u32;
    RecoveredMission {
        stage,
        repair_remaining: max_repair_iterations.saturating_sub(attempts),
    }
}

/// Drives an approved mission through its stages.
pub struct MissionRunner<L: LlmAdapter, R, T, C: Clock, G: IdGen> {
    pub(crate) deps: MissionDeps<L, R, T>,
    pub(crate) emitter: Emitter<C, G>,
    pub(crate) approvals: Arc<ApprovalManager>,
    pub(crate) applier: DiffApplier<Box<dyn CommitFs>>,
    pub(crate) checkpoints: Mutex<CheckpointStore<C>>,
    pub(crate) selector: ExcerptSelector,
    pub(crate) edit_tool: EditTool<L>,
    pub(crate) fence: CreatePathFence,
    pub(crate) guard: ScopeGuard,
    pub(crate) evidence: EvidenceStore,
    pub(crate) config: EngineConfig,
    pub(crate) workspace_root: PathBuf,
    pub(crate) mission: Mission,
    pub(crate) id_gen: G,
    pub(crate) clock: C,
    stop: Arc<StopHandle>,
    stage: Mutex<MissionStage>,
    /// Test commands already approved this mission; re-use auto-approves.
    pub(crate) approved_commands: Mutex<HashSet<String>>,
    /// Outcomes consumed by the loop detector.
    pub(crate) history: Mutex<Vec<IterationOutcome>>,
    /// Results of the most recent retrieval step.
    pub(crate) last_retrieval: Mutex<Vec<RankedPath>>,
}

impl<L, R, T, C, G> MissionRunner<L, R, T, C, G>
where
    L: LlmAdapter,
    R: RetrievalAdapter,
    T: CommandRunner,
    C: Clock,
    G: IdGen,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        deps: MissionDeps<L, R, T>,
        bus: Arc<EventBus>,
        workspace_root: impl Into<PathBuf>,
        mission: Mission,
        task_id: TaskId,
        config: EngineConfig,
        clock: C,
        id_gen: G,
    ) -> Result<Self, EngineError> {
        let workspace_root = workspace_root.into();
        let paths = OrdinexPaths::new(&workspace_root);
        let emitter = Emitter::new(
            bus,
            clock.clone(),
            id_gen.clone(),
            task_id,
            Mode::Mission,
        );
        let checkpoints = CheckpointStore::open_with_clock(
            &workspace_root,
            paths.checkpoints_dir(),
            config.checkpoint_policy(),
            clock.clone(),
        )?;
        let edit_tool = EditTool::new(Arc::clone(&deps.llm), config.edit.clone());
        let fence = CreatePathFence::new(&config.fence)?;
        let guard = ScopeGuard::with_extra(&mission.scope.out_of_scope)?;
        let selector = ExcerptSelector::new(config.selector.clone());
        let evidence = EvidenceStore::new(paths.evidence_dir());
        let applier = DiffApplier::with_fs(&workspace_root, Box::new(RealFs) as Box<dyn CommitFs>);

        Ok(Self {
            deps,
            emitter,
            approvals: Arc::new(ApprovalManager::new()),
            applier,
            checkpoints: Mutex::new(checkpoints),
            selector,
            edit_tool,
            fence,
            guard,
            evidence,
            config,
            workspace_root,
            mission,
            id_gen,
            clock,
            stop: StopHandle::new(),
            stage: Mutex::new(MissionStage::RetrieveContext),
            approved_commands: Mutex::new(HashSet::new()),
            history: Mutex::new(Vec::new()),
            last_retrieval: Mutex::new(Vec::new()),
        })
    }

    pub fn approvals(&self) -> Arc<ApprovalManager> {
        Arc::clone(&self.approvals)
    }

    pub fn emitter(&self) -> &Emitter<C, G> {
        &self.emitter
    }

    pub fn stop_handle(&self) -> Arc<StopHandle> {
        Arc::clone(&self.stop)
    }

    /// Swap the commit filesystem (fault injection in tests).
    pub fn with_commit_fs(mut self, fs: Box<dyn CommitFs>) -> Self {
        self.applier = DiffApplier::with_fs(&self.workspace_root, fs);
        self
    }

    pub fn stage(&self) -> MissionStage {
        *self.stage.lock()
    }

    /// Transition the machine. Refused from terminal stages.
    pub(crate) fn transition(&self, to: MissionStage) -> bool {
        let mut stage = self.stage.lock();
        if stage.is_terminal() {
            warn!(from = ?*stage, ?to, "transition refused from terminal stage");
            return false;
        }
        *stage = to;
        true
    }

    /// Emit `stage_changed` and update the envelope stage label.
    pub(crate) fn change_stage(&self, to: Stage) -> Result<(), EngineError> {
        let from = self.emitter.stage();
        if from == to {
            return Ok(());
        }
        self.emitter.set_stage(to);
        self.emitter.emit(EventPayload::StageChanged { from, to })?;
        Ok(())
    }

    /// Request a user stop: cancels in-flight awaits and pending approvals.
    pub fn stop(&self) -> Result<(), EngineError> {
        info!(task = %self.emitter.task_id(), "stop requested");
        self.stop.stop();
        self.emitter.emit(EventPayload::ExecutionStopped)?;
        self.approvals.cancel_all(&self.emitter)?;
        Ok(())
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Await a future under a per-stage timeout, racing the stop signal.
    pub(crate) async fn bounded<Fut, Out>(&self, secs: u64, fut: Fut) -> Bounded<Out>
    where
        Fut: Future<Output = Out>,
    {
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => Bounded::Stopped,
            result = tokio::time::timeout(Duration::from_secs(secs), fut) => match result {
                Ok(out) => Bounded::Done(out),
                Err(_) => Bounded::TimedOut {
                    elapsed_ms: secs.saturating_mul(1000),
                },
            },
        }
    }

    /// Execute the mission to a terminal stage.
    pub async fn run(&self) -> Result<MissionStage, EngineError> {
        let mission_id = self.mission.mission_id.clone();
        self.emitter.emit(EventPayload::MissionStarted {
            mission_id: mission_id.clone(),
        })?;

        for step in &self.mission.included_steps {
            if self.is_stopped() {
                return self.finish_cancelled();
            }

            let outcome = match self.execute_step(step).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Unexpected orchestration error: capture, fail the
                    // step, pause the mission.
                    error!(error = %e, step = %step.step_id, "execution exception");
                    self.emitter.emit(EventPayload::FailureDetected {
                        reason: FailureReason::ExecutionException,
                        error_type: "execution_exception".to_string(),
                        details: e.to_string(),
                        checkpoint_id: None,
                        rollback: None,
                    })?;
                    self.emitter.emit(EventPayload::StepFailed {
                        step_id: step.step_id.clone(),
                        error: e.to_string(),
                    })?;
                    return self.finish_paused(FailureReason::ExecutionException, None);
                }
            };

            match outcome {
                StepOutcome::Completed => {}
                StepOutcome::Failed { reason, detail } => {
                    self.emitter.emit(EventPayload::StepFailed {
                        step_id: step.step_id.clone(),
                        error: detail.clone(),
                    })?;
                    return self.finish_paused(reason, Some(detail));
                }
                StepOutcome::Denied { reason } => {
                    self.emitter.emit(EventPayload::ExecutionPaused {
                        reason,
                        detail: None,
                    })?;
                    return self.finish_paused(reason, None);
                }
                StepOutcome::Cancelled => return self.finish_cancelled(),
            }
        }

        self.transition(MissionStage::MissionCompleted);
        self.emitter
            .emit(EventPayload::MissionCompleted { mission_id })?;
        Ok(MissionStage::MissionCompleted)
    }

    fn finish_paused(
        &self,
        reason: FailureReason,
        detail: Option<String>,
    ) -> Result<MissionStage, EngineError> {
        self.transition(MissionStage::MissionPaused);
        self.emitter.emit(EventPayload::MissionPaused {
            mission_id: self.mission.mission_id.clone(),
            reason,
            detail,
        })?;
        Ok(MissionStage::MissionPaused)
    }

    fn finish_cancelled(&self) -> Result<MissionStage, EngineError> {
        self.transition(MissionStage::MissionCancelled);
        self.emitter.emit(EventPayload::MissionCancelled {
            mission_id: self.mission.mission_id.clone(),
        })?;
        Ok(MissionStage::MissionCancelled)
    }
}

#[cfg(test)]
#[path = "mission_tests.rs"]
mod tests;
