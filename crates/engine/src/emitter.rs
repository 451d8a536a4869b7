// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope construction and publication for one task.
//!
//! Components never build envelopes by hand; the emitter stamps identity,
//! timestamp, and the task's current mode/stage, then publishes through
//! the bus (durable before return).

use crate::bus::EventBus;
use crate::error::EngineError;
use ordinex_core::{Clock, Event, EventId, EventPayload, EvidenceId, IdGen, Mode, Stage, TaskId};
use parking_lot::Mutex;
use std::sync::Arc;

pub struct Emitter<C: Clock, G: IdGen> {
    bus: Arc<EventBus>,
    clock: C,
    id_gen: G,
    task_id: TaskId,
    mode: Mutex<Mode>,
    stage: Mutex<Stage>,
}

impl<C: Clock, G: IdGen> Emitter<C, G> {
    pub fn new(bus: Arc<EventBus>, clock: C, id_gen: G, task_id: TaskId, mode: Mode) -> Self {
        Self {
            bus,
            clock,
            id_gen,
            task_id,
            mode: Mutex::new(mode),
            stage: Mutex::new(Stage::None),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn stage(&self) -> Stage {
        *self.stage.lock()
    }

    /// Update the stage label stamped on subsequent events. The
    /// `stage_changed` event itself is the caller's responsibility.
    pub fn set_stage(&self, stage: Stage) {
        *self.stage.lock() = stage;
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock()
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock() = mode;
    }

    fn build(&self, payload: EventPayload) -> Event {
        Event::new(
            EventId::new(self.id_gen.next()),
            self.task_id.clone(),
            self.clock.utc(),
            self.mode(),
            self.stage(),
            payload,
        )
    }

    /// Publish a payload wrapped in this task's envelope.
    pub fn emit(&self, payload: EventPayload) -> Result<Event, EngineError> {
        let event = self.build(payload);
        self.bus.publish(event.clone())?;
        Ok(event)
    }

    /// Publish with evidence references attached.
    pub fn emit_with_evidence(
        &self,
        payload: EventPayload,
        evidence_ids: Vec<EvidenceId>,
    ) -> Result<Event, EngineError> {
        let event = self.build(payload).with_evidence(evidence_ids);
        self.bus.publish(event.clone())?;
        Ok(event)
    }

    /// Publish with a causal back-pointer to a parent event.
    pub fn emit_with_parent(
        &self,
        payload: EventPayload,
        parent: EventId,
    ) -> Result<Event, EngineError> {
        let event = self.build(payload).with_parent(parent);
        self.bus.publish(event.clone())?;
        Ok(event)
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
