// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository retrieval seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Limits the index applies to one retrieval call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalBudgets {
    pub max_results: usize,
}

impl Default for RetrievalBudgets {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

/// One ranked hit from the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPath {
    pub path: PathBuf,
    pub score: f32,
}

impl RankedPath {
    pub fn new(path: impl Into<PathBuf>, score: f32) -> Self {
        Self {
            path: path.into(),
            score,
        }
    }
}

/// Errors from the retrieval seam
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("index unavailable: {0}")]
    Unavailable(String),
    #[error("retrieval failed: {0}")]
    Failed(String),
}

/// Lexical/semantic retrieval over the workspace.
#[async_trait]
pub trait RetrievalAdapter: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        budgets: &RetrievalBudgets,
    ) -> Result<Vec<RankedPath>, RetrievalError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRetrievalAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake index returning preset results and recording queries.
    #[derive(Clone, Default)]
    pub struct FakeRetrievalAdapter {
        inner: Arc<Mutex<FakeRetrievalState>>,
    }

    #[derive(Default)]
    struct FakeRetrievalState {
        results: Vec<RankedPath>,
        error: Option<RetrievalError>,
        queries: Vec<String>,
    }

    impl FakeRetrievalAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_results(&self, results: Vec<RankedPath>) {
            self.inner.lock().results = results;
        }

        pub fn set_error(&self, error: RetrievalError) {
            self.inner.lock().error = Some(error);
        }

        pub fn queries(&self) -> Vec<String> {
            self.inner.lock().queries.clone()
        }
    }

    #[async_trait]
    impl RetrievalAdapter for FakeRetrievalAdapter {
        async fn retrieve(
            &self,
            query: &str,
            budgets: &RetrievalBudgets,
        ) -> Result<Vec<RankedPath>, RetrievalError> {
            let mut state = self.inner.lock();
            state.queries.push(query.to_string());
            if let Some(error) = &state.error {
                return Err(error.clone());
            }
            let mut results = state.results.clone();
            results.truncate(budgets.max_results);
            Ok(results)
        }
    }
}

#[cfg(test)]
#[path = "retrieval_tests.rs"]
mod tests;
