// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval protocol: request, await, resolve.
//!
//! A request suspends the caller on a oneshot until the frontend resolves
//! it (or the task stops, which resolves everything as cancelled). The
//! `approval_resolved` event is published before the waiter wakes, so it
//! always follows its `approval_requested` in the log.

use crate::emitter::Emitter;
use crate::error::EngineError;
use ordinex_core::{Approval, ApprovalDecision, ApprovalId, Clock, EventPayload, IdGen};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

struct PendingEntry {
    approval: Approval,
    tx: oneshot::Sender<ApprovalDecision>,
}

/// Tracks pending approvals for one task.
#[derive(Default)]
pub struct ApprovalManager {
    pending: Mutex<HashMap<ApprovalId, PendingEntry>>,
}

impl ApprovalManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an approval and suspend until it is resolved.
    ///
    /// Emits `approval_requested` before suspending. A dropped resolver
    /// (task teardown) surfaces as `Cancelled`.
    pub async fn request<C: Clock, G: IdGen>(
        &self,
        emitter: &Emitter<C, G>,
        approval: Approval,
    ) -> Result<ApprovalDecision, EngineError> {
        let (tx, rx) = oneshot::channel();
        let approval_id = approval.id.clone();

        {
            let mut pending = self.pending.lock();
            pending.insert(
                approval_id.clone(),
                PendingEntry {
                    approval: approval.clone(),
                    tx,
                },
            );
        }

        emitter.emit(EventPayload::ApprovalRequested {
            approval_id: approval_id.clone(),
            approval_type: approval.approval_type,
            description: approval.description.clone(),
            diff_id: approval.diff_id.clone(),
        })?;

        let decision = rx.await.unwrap_or(ApprovalDecision::Cancelled);
        debug!(id = %approval_id, ?decision, "approval resolved");
        Ok(decision)
    }

    /// Resolve a pending approval, publishing `approval_resolved` before
    /// the waiting task resumes.
    pub fn resolve<C: Clock, G: IdGen>(
        &self,
        emitter: &Emitter<C, G>,
        approval_id: &ApprovalId,
        decision: ApprovalDecision,
    ) -> Result<(), EngineError> {
        let entry = self.pending.lock().remove(approval_id);
        let Some(entry) = entry else {
            warn!(id = %approval_id, "resolve for unknown approval id");
            return Ok(());
        };

        emitter.emit(EventPayload::ApprovalResolved {
            approval_id: approval_id.clone(),
            decision,
            diff_id: entry.approval.diff_id.clone(),
        })?;

        // Receiver may have been dropped by a stopping task; the event is
        // already durable either way.
        let _ = entry.tx.send(decision);
        Ok(())
    }

    /// Resolve every in-flight approval as cancelled (task stop).
    pub fn cancel_all<C: Clock, G: IdGen>(
        &self,
        emitter: &Emitter<C, G>,
    ) -> Result<(), EngineError> {
        let entries: Vec<(ApprovalId, PendingEntry)> =
            self.pending.lock().drain().collect();
        for (approval_id, entry) in entries {
            emitter.emit(EventPayload::ApprovalResolved {
                approval_id: approval_id.clone(),
                decision: ApprovalDecision::Cancelled,
                diff_id: entry.approval.diff_id.clone(),
            })?;
            let _ = entry.tx.send(ApprovalDecision::Cancelled);
        }
        Ok(())
    }

    /// Snapshot of currently pending approvals.
    pub fn pending(&self) -> Vec<Approval> {
        let mut list: Vec<Approval> = self
            .pending
            .lock()
            .values()
            .map(|e| e.approval.clone())
            .collect();
        list.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        list
    }
}

#[cfg(test)]
#[path = "approvals_tests.rs"]
mod tests;
