// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn base_sha_is_12_hex_lowercase() {
    let sha = base_sha(b"hello world\n");
    assert_eq!(sha.len(), BASE_SHA_LEN);
    assert!(sha.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(sha, sha.to_ascii_lowercase());
}

#[test]
fn base_sha_is_stable_across_runs() {
    let content = b"fn main() {}\n";
    assert_eq!(base_sha(content), base_sha(content));
}

#[test]
fn base_sha_differs_on_content_change() {
    assert_ne!(base_sha(b"a"), base_sha(b"b"));
}

#[test]
fn is_stale_detects_drift() {
    let sha = base_sha(b"original");
    assert!(!is_stale(b"original", &sha));
    assert!(is_stale(b"modified", &sha));
}

#[test]
fn is_stale_compares_case_insensitively() {
    let sha = base_sha(b"content").to_ascii_uppercase();
    assert!(!is_stale(b"content", &sha));
}

#[test]
fn batch_staleness_reports_only_divergent_paths() {
    let fresh = b"fresh".to_vec();
    let drifted = b"drifted".to_vec();
    let current: HashMap<PathBuf, Vec<u8>> = [
        (PathBuf::from("src/a.ts"), fresh.clone()),
        (PathBuf::from("src/b.ts"), drifted),
    ]
    .into();
    let expected: HashMap<PathBuf, String> = [
        (PathBuf::from("src/a.ts"), base_sha(&fresh)),
        (PathBuf::from("src/b.ts"), base_sha(b"original b")),
    ]
    .into();

    let stale = check_batch_staleness(&current, &expected);
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].path, PathBuf::from("src/b.ts"));
    assert_eq!(stale[0].actual, base_sha(b"drifted"));
}

#[test]
fn batch_staleness_reports_missing_files() {
    let current = HashMap::new();
    let expected: HashMap<PathBuf, String> =
        [(PathBuf::from("src/gone.ts"), "a1b2c3d4e5f6".to_string())].into();

    let stale = check_batch_staleness(&current, &expected);
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].actual, "");
}

#[test]
fn batch_staleness_order_is_deterministic() {
    let expected: HashMap<PathBuf, String> = [
        (PathBuf::from("z.ts"), "000000000000".to_string()),
        (PathBuf::from("a.ts"), "000000000000".to_string()),
        (PathBuf::from("m.ts"), "000000000000".to_string()),
    ]
    .into();

    let stale = check_batch_staleness(&HashMap::new(), &expected);
    let paths: Vec<_> = stale.iter().map(|s| s.path.clone()).collect();
    assert_eq!(
        paths,
        vec![PathBuf::from("a.ts"), PathBuf::from("m.ts"), PathBuf::from("z.ts")]
    );
}
