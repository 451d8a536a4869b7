// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ordinex-adapters: seams to the runtime's external collaborators.
//!
//! The engine never talks to a provider, an index, or a subprocess
//! directly; it goes through these traits. Fakes (behind `test-support`)
//! give deterministic control over every seam.

pub mod command;
pub mod llm;
pub mod retrieval;

pub use command::{CommandError, CommandOutput, CommandRunner, ShellCommandRunner};
pub use llm::{LlmAdapter, LlmError, LlmMessage, LlmRequest, LlmResponse, Role, StopReason};
pub use retrieval::{RankedPath, RetrievalAdapter, RetrievalBudgets, RetrievalError};

#[cfg(any(test, feature = "test-support"))]
pub use command::FakeCommandRunner;
#[cfg(any(test, feature = "test-support"))]
pub use llm::FakeLlmAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use retrieval::FakeRetrievalAdapter;
