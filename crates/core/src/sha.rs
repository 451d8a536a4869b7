// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content hashing for staleness detection.
//!
//! Every file sent to the model is fingerprinted with a truncated SHA-256.
//! Twelve hex chars (~48 bits) are enough to catch accidental drift across
//! a prompt roundtrip while keeping payloads compact.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

/// Number of hex characters kept from the full SHA-256 digest.
pub const BASE_SHA_LEN: usize = 12;

/// Compute the 12-hex truncated SHA-256 of file content, lowercase.
pub fn base_sha(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut hex = format!("{:x}", digest);
    hex.truncate(BASE_SHA_LEN);
    hex
}

/// True when the current content no longer matches the expected sha.
///
/// Comparison is case-insensitive; shas are stored lowercase but callers
/// may hold user-supplied values.
pub fn is_stale(current: &[u8], expected_sha: &str) -> bool {
    !base_sha(current).eq_ignore_ascii_case(expected_sha)
}

/// A file whose workspace content disagrees with the declared sha.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleFile {
    pub path: PathBuf,
    pub expected: String,
    pub actual: String,
}

/// Compare current content against the expected sha map.
///
/// Returns one entry per path whose content disagrees. Paths present in
/// `expected` but missing from `current` are reported with an empty actual
/// sha (the file vanished).
pub fn check_batch_staleness(
    current: &HashMap<PathBuf, Vec<u8>>,
    expected: &HashMap<PathBuf, String>,
) -> Vec<StaleFile> {
    let mut stale = Vec::new();
    for (path, expected_sha) in expected {
        match current.get(path) {
            Some(content) => {
                let actual = base_sha(content);
                if !actual.eq_ignore_ascii_case(expected_sha) {
                    stale.push(StaleFile {
                        path: path.clone(),
                        expected: expected_sha.to_ascii_lowercase(),
                        actual,
                    });
                }
            }
            None => stale.push(StaleFile {
                path: path.clone(),
                expected: expected_sha.to_ascii_lowercase(),
                actual: String::new(),
            }),
        }
    }
    // Deterministic report order regardless of map iteration
    stale.sort_by(|a, b| a.path.cmp(&b.path));
    stale
}

#[cfg(test)]
#[path = "sha_tests.rs"]
mod tests;
