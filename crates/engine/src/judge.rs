// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt-quality judge.
//!
//! A cheap model call classifies the planning request before any plan is
//! generated. Judge failure never blocks the user: the fallback is a
//! medium-clarity verdict with a structural rewrite of the prompt.

use ordinex_adapters::{LlmAdapter, LlmMessage, LlmRequest};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clarity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Answer,
    Plan,
    Mission,
}

/// The judge's assessment of a planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub clarity: Clarity,
    pub intent: Intent,
    #[serde(default)]
    pub missing_info: Vec<String>,
    /// Structured version of the prompt; never invents requirements.
    pub safe_rewrite: String,
    #[serde(default)]
    pub clarifying_question: Option<String>,
}

impl JudgeVerdict {
    /// The prompt the planner should actually use.
    ///
    /// High clarity keeps the original; medium substitutes the rewrite;
    /// low returns None — the caller must pause on the clarifying
    /// question first.
    pub fn effective_prompt<'a>(&'a self, original: &'a str) -> Option<&'a str> {
        match self.clarity {
            Clarity::High => Some(original),
            Clarity::Medium => Some(&self.safe_rewrite),
            Clarity::Low => None,
        }
    }
}

const JUDGE_SYSTEM_PROMPT: &str = "\
You assess a user's coding request before planning. Respond with JSON only:
{\"clarity\": \"high|medium|low\", \"intent\": \"answer|plan|mission\",
 \"missing_info\": [..], \"safe_rewrite\": \"...\",
 \"clarifying_question\": \"...\"}
The safe_rewrite restructures the request without inventing requirements.
Ask at most one clarifying question, only when clarity is low.";

pub struct PromptJudge {
    max_tokens: u32,
}

impl Default for PromptJudge {
    fn default() -> Self {
        Self { max_tokens: 1024 }
    }
}

impl PromptJudge {
    pub fn new(max_tokens: u32) -> Self {
        Self { max_tokens }
    }

    /// Assess the prompt. Never fails; judge errors degrade to the
    /// structural fallback.
    pub async fn assess<L: LlmAdapter>(&self, llm: &L, prompt: &str) -> JudgeVerdict {
        let request = LlmRequest {
            messages: vec![
                LlmMessage::system(JUDGE_SYSTEM_PROMPT),
                LlmMessage::user(prompt),
            ],
            tools: vec![],
            max_tokens: self.max_tokens,
        };

        match llm.send(request).await {
            Ok(response) => match serde_json::from_str::<JudgeVerdict>(&response.content) {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!(error = %e, "judge returned invalid JSON, using fallback");
                    fallback_verdict(prompt)
                }
            },
            Err(e) => {
                warn!(error = %e, "judge call failed, using fallback");
                fallback_verdict(prompt)
            }
        }
    }
}

/// Structural rewrite used when the judge is unavailable: medium clarity,
/// so planning proceeds on the rewritten prompt.
fn fallback_verdict(prompt: &str) -> JudgeVerdict {
    let trimmed = prompt.trim();
    JudgeVerdict {
        clarity: Clarity::Medium,
        intent: Intent::Plan,
        missing_info: Vec::new(),
        safe_rewrite: format!("Goal: {trimmed}\nConstraints: none stated\nDeliverable: code change"),
        clarifying_question: None,
    }
}

#[cfg(test)]
#[path = "judge_tests.rs"]
mod tests;
