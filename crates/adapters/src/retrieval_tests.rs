// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_returns_preset_results() {
    let index = FakeRetrievalAdapter::new();
    index.set_results(vec![
        RankedPath::new("src/app.ts", 0.9),
        RankedPath::new("src/util.ts", 0.5),
    ]);

    let results = index
        .retrieve("greeting", &RetrievalBudgets::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].path, std::path::PathBuf::from("src/app.ts"));
    assert_eq!(index.queries(), vec!["greeting"]);
}

#[tokio::test]
async fn budget_truncates_results() {
    let index = FakeRetrievalAdapter::new();
    index.set_results(vec![
        RankedPath::new("a", 0.3),
        RankedPath::new("b", 0.2),
        RankedPath::new("c", 0.1),
    ]);

    let results = index
        .retrieve("q", &RetrievalBudgets { max_results: 2 })
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn fake_error_propagates() {
    let index = FakeRetrievalAdapter::new();
    index.set_error(RetrievalError::Unavailable("index offline".to_string()));
    assert!(index
        .retrieve("q", &RetrievalBudgets::default())
        .await
        .is_err());
}
