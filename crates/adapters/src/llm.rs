// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM provider seam.
//!
//! One primitive: `send(messages, tools, max_tokens) -> structured output`.
//! The stop reason is part of the contract — `MaxTokens` is how callers
//! detect truncated output and trigger split-by-file retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<LlmMessage>,
    /// Tool schemas offered to the provider, when any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<serde_json::Value>,
    pub max_tokens: u32,
}

/// Why the provider stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    /// Output hit the token ceiling — the response is truncated.
    MaxTokens,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub stop_reason: StopReason,
}

impl LlmResponse {
    pub fn truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

/// Errors from the provider seam
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("call interrupted by task stop")]
    Interrupted,
}

/// The one primitive the runtime needs from any provider.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn send(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLlmAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Fake provider for deterministic testing.
    ///
    /// Responses are scripted in order; every request is recorded.
    #[derive(Clone, Default)]
    pub struct FakeLlmAdapter {
        inner: Arc<Mutex<FakeLlmState>>,
    }

    #[derive(Default)]
    struct FakeLlmState {
        script: VecDeque<Result<LlmResponse, LlmError>>,
        requests: Vec<LlmRequest>,
    }

    impl FakeLlmAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a complete response.
        pub fn push_response(&self, content: impl Into<String>) {
            self.inner.lock().script.push_back(Ok(LlmResponse {
                content: content.into(),
                stop_reason: StopReason::EndTurn,
            }));
        }

        /// Queue a response cut off at the token ceiling.
        pub fn push_truncated(&self, content: impl Into<String>) {
            self.inner.lock().script.push_back(Ok(LlmResponse {
                content: content.into(),
                stop_reason: StopReason::MaxTokens,
            }));
        }

        pub fn push_error(&self, error: LlmError) {
            self.inner.lock().script.push_back(Err(error));
        }

        /// All requests seen so far.
        pub fn requests(&self) -> Vec<LlmRequest> {
            self.inner.lock().requests.clone()
        }

        pub fn call_count(&self) -> usize {
            self.inner.lock().requests.len()
        }
    }

    #[async_trait]
    impl LlmAdapter for FakeLlmAdapter {
        async fn send(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
            let mut state = self.inner.lock();
            state.requests.push(request);
            state
                .script
                .pop_front()
                .unwrap_or(Err(LlmError::Unavailable(
                    "no scripted response".to_string(),
                )))
        }
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
