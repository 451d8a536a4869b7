// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ordinex_core::test_support::{intent_event, mission_started_event};
use std::fs;

fn log_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join(".ordinex/events.jsonl")
}

#[test]
fn open_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let log = EventLog::open(&log_path(&dir)).unwrap();
    assert!(log.is_empty());
    assert!(dir.path().join(".ordinex").is_dir());
}

#[test]
fn append_is_not_durable_until_flush() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let mut log = EventLog::open(&path).unwrap();

    log.append(&intent_event("task-1", 1, "hello")).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "");

    log.flush().unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("intent_received"));
    assert!(content.ends_with('\n'));
}

#[test]
fn entries_replay_in_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = EventLog::open(&log_path(&dir)).unwrap();

    log.append(&intent_event("task-1", 1, "a")).unwrap();
    log.append(&mission_started_event("task-1", 2, "m-1")).unwrap();
    log.flush().unwrap();

    let events = log.entries().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind(), "intent_received");
    assert_eq!(events[1].kind(), "mission_started");
}

#[test]
fn entries_from_offset() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = EventLog::open(&log_path(&dir)).unwrap();
    for i in 0..4 {
        log.append(&intent_event("task-1", i, "x")).unwrap();
    }
    log.flush().unwrap();

    assert_eq!(log.entries_from(2).unwrap().len(), 2);
    assert_eq!(log.entries_from(10).unwrap().len(), 0);
}

#[test]
fn events_by_task_filters() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = EventLog::open(&log_path(&dir)).unwrap();
    log.append(&intent_event("task-1", 1, "a")).unwrap();
    log.append(&intent_event("task-2", 2, "b")).unwrap();
    log.append(&mission_started_event("task-1", 3, "m-1")).unwrap();
    log.flush().unwrap();

    let events = log.events_by_task(&TaskId::new("task-1")).unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.task_id == "task-1"));
}

#[test]
fn reopen_resumes_at_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    {
        let mut log = EventLog::open(&path).unwrap();
        log.append(&intent_event("task-1", 1, "a")).unwrap();
        log.flush().unwrap();
    }
    let mut log = EventLog::open(&path).unwrap();
    assert_eq!(log.len(), 1);
    log.append(&mission_started_event("task-1", 2, "m-1")).unwrap();
    log.flush().unwrap();
    assert_eq!(log.entries().unwrap().len(), 2);
}

#[test]
fn corrupt_tail_is_rotated_preserving_valid_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    {
        let mut log = EventLog::open(&path).unwrap();
        log.append(&intent_event("task-1", 1, "a")).unwrap();
        log.append(&intent_event("task-1", 2, "b")).unwrap();
        log.flush().unwrap();
    }
    // Simulate a crash mid-write
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("{\"event_id\": \"evt-3\", \"task_id\": tru");
    fs::write(&path, content).unwrap();

    let log = EventLog::open(&path).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log.entries().unwrap().len(), 2);
    assert!(PathBuf::from(format!("{}.bak", path.display())).exists());
}

#[test]
fn unknown_event_tags_survive_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    {
        let mut log = EventLog::open(&path).unwrap();
        log.append(&intent_event("task-1", 1, "a")).unwrap();
        log.flush().unwrap();
    }
    // A future tag with a well-formed envelope is valid, not corruption
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str(
        "{\"event_id\":\"evt-2\",\"task_id\":\"task-1\",\"timestamp\":\"1970-01-01T00:16:40Z\",\"type\":\"from_the_future\",\"mode\":\"mission\",\"stage\":\"none\"}\n",
    );
    fs::write(&path, content).unwrap();

    let log = EventLog::open(&path).unwrap();
    let events = log.entries().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].kind(), "unknown");
}
