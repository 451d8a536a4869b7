// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hard scope fence enforced at filesystem access time.
//!
//! Retrieval filters are advisory; this is not. Reads and writes under
//! security roots are denied at the point of access, whatever upstream
//! selection produced the path.

use crate::error::EngineError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Roots no mission may ever read or write.
const HARD_DENIED: [&str; 12] = [
    "node_modules/**",
    "**/node_modules/**",
    "dist/**",
    "build/**",
    "out/**",
    ".next/**",
    ".env*",
    "**/.env*",
    "**/*.pem",
    "**/*.key",
    "**/*.crt",
    "**/id_rsa*",
];

fn build_globset(patterns: &[String]) -> Result<GlobSet, EngineError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| EngineError::Glob(e.to_string()))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| EngineError::Glob(e.to_string()))
}

/// Deny-only guard for workspace file access.
pub struct ScopeGuard {
    deny: GlobSet,
}

impl ScopeGuard {
    /// Guard with the built-in security roots.
    pub fn new() -> Result<Self, EngineError> {
        let patterns: Vec<String> = HARD_DENIED.iter().map(|s| s.to_string()).collect();
        Ok(Self {
            deny: build_globset(&patterns)?,
        })
    }

    /// Built-ins plus the mission's declared out-of-scope globs.
    pub fn with_extra(extra: &[String]) -> Result<Self, EngineError> {
        let mut patterns: Vec<String> = HARD_DENIED.iter().map(|s| s.to_string()).collect();
        patterns.extend(extra.iter().cloned());
        Ok(Self {
            deny: build_globset(&patterns)?,
        })
    }

    pub fn is_denied(&self, path: &Path) -> bool {
        self.deny.is_match(path)
    }

    /// Error unless the path is accessible.
    pub fn check_access(&self, path: &Path) -> Result<(), EngineError> {
        if self.is_denied(path) {
            return Err(EngineError::ScopeDenied(path.to_path_buf()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
