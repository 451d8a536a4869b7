// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: durable append, then ordered fan-out.
//!
//! `publish` writes the event to the log and fsyncs before any subscriber
//! sees it — the log is the source of truth, subscribers are a cache.
//! A slow or dropped subscriber never blocks the publisher; its channel
//! is removed on the first failed delivery.

use crate::error::EngineError;
use ordinex_core::{Event, EventPayload, TaskId};
use ordinex_storage::{EventLog, LogError};
use parking_lot::Mutex;
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors from bus operations
#[derive(Debug, Error)]
pub enum BusError {
    #[error("storage error: {0}")]
    Log(#[from] LogError),
    #[error("cannot publish an unknown event tag")]
    UnknownTag,
}

/// Which events a subscription receives.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only events for this task; None means all tasks.
    pub task_id: Option<TaskId>,
    /// Cold-start offset: replay durable events from here before going live.
    pub from_offset: Option<u64>,
}

impl EventFilter {
    pub fn task(task_id: TaskId) -> Self {
        Self {
            task_id: Some(task_id),
            from_offset: None,
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.task_id
            .as_ref()
            .is_none_or(|task_id| &event.task_id == task_id)
    }
}

struct Subscriber {
    filter: EventFilter,
    tx: mpsc::UnboundedSender<Event>,
}

/// Single totally-ordered sink for all domain events.
pub struct EventBus {
    log: Mutex<EventLog>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventBus {
    /// Open the bus over the log at `path`.
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let log = EventLog::open(path).map_err(BusError::Log)?;
        Ok(Self {
            log: Mutex::new(log),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Durably append an event, then deliver it to matching subscribers.
    ///
    /// Returns the event's offset in the log. The write is flushed before
    /// this returns; a write failure means no subscriber saw the event.
    pub fn publish(&self, event: Event) -> Result<u64, BusError> {
        if matches!(event.payload, EventPayload::Unknown) {
            return Err(BusError::UnknownTag);
        }

        // Hold the log lock across append+flush+fanout so per-task order
        // seen by subscribers matches log order.
        let mut log = self.log.lock();
        let offset = log.append(&event)?;
        log.flush()?;

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| {
            if !s.filter.matches(&event) {
                return true;
            }
            match s.tx.send(event.clone()) {
                Ok(()) => true,
                Err(_) => {
                    debug!("dropping closed subscriber");
                    false
                }
            }
        });

        Ok(offset)
    }

    /// Subscribe to events matching the filter.
    ///
    /// With `from_offset` set, durable events from that offset are
    /// delivered first (cold read), then the subscription goes live.
    pub fn subscribe(&self, filter: EventFilter) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();

        // Register under the log lock so no published event lands between
        // the cold replay and going live.
        let log = self.log.lock();
        if let Some(offset) = filter.from_offset {
            if let Ok(events) = log.entries_from(offset) {
                for event in events {
                    if filter.matches(&event) && tx.send(event).is_err() {
                        return rx;
                    }
                }
            }
        }
        self.subscribers.lock().push(Subscriber { filter, tx });
        rx
    }

    /// All durable events for a task, in insertion order.
    pub fn events_by_task(&self, task_id: &TaskId) -> Result<Vec<Event>, BusError> {
        Ok(self.log.lock().events_by_task(task_id)?)
    }

    /// All durable events.
    pub fn entries(&self) -> Result<Vec<Event>, BusError> {
        Ok(self.log.lock().entries()?)
    }

    /// Number of durable events.
    pub fn len(&self) -> u64 {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
