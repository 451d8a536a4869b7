// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use crate::applier::ApplyError;
use crate::bus::BusError;
use ordinex_adapters::{CommandError, LlmError, RetrievalError};
use ordinex_patch::PatchError;
use ordinex_storage::{CheckpointError, EvidenceError, LogError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
    #[error("storage error: {0}")]
    Log(#[from] LogError),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("evidence error: {0}")]
    Evidence(#[from] EvidenceError),
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),
    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("command error: {0}")]
    Command(#[from] CommandError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid glob pattern: {0}")]
    Glob(String),
    #[error("access denied by scope fence: {0}")]
    ScopeDenied(PathBuf),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("task stopped by user")]
    Stopped,
}
