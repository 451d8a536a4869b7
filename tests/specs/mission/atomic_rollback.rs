//! Scenario: a two-file diff where the second rename fails; the pipeline
//! must leave the workspace byte-identical to its pre-apply state.

use crate::prelude::*;
use ordinex_core::{base_sha, EventPayload, FailureReason};
use ordinex_engine::{CommitFs, MissionStage, RealFs};
use parking_lot::Mutex;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Fails the nth rename, delegating everything else to the real fs.
struct FailNthRename {
    calls: Mutex<usize>,
    fail_at: usize,
}

impl CommitFs for FailNthRename {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        RealFs.write(path, bytes)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut calls = self.calls.lock();
        *calls += 1;
        if *calls == self.fail_at {
            return Err(io::Error::other("simulated rename failure"));
        }
        RealFs.rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        RealFs.remove(path)
    }
}

const FILE_A: &str = "alpha one\nalpha two\n";
const FILE_B: &str = "beta one\nbeta two\n";

fn two_file_response() -> String {
    let diff = "\
--- a/src/a.ts
+++ b/src/a.ts
@@ -1,2 +1,2 @@
-alpha one
+alpha ONE
 alpha two
--- a/src/b.ts
+++ b/src/b.ts
@@ -1,2 +1,2 @@
-beta one
+beta ONE
 beta two
";
    serde_json::json!({
        "unified_diff": diff,
        "touched_files": [
            {"path": "src/a.ts", "action": "update", "base_sha": base_sha(FILE_A.as_bytes())},
            {"path": "src/b.ts", "action": "update", "base_sha": base_sha(FILE_B.as_bytes())},
        ],
        "complete": true,
    })
    .to_string()
}

#[tokio::test]
async fn mid_commit_rename_failure_restores_the_whole_batch() {
    let ws = workspace(mission_with_steps(
        &["Update src/a.ts and src/b.ts"],
        &["src/a.ts", "src/b.ts"],
    ));
    ws.write_file("src/a.ts", FILE_A);
    ws.write_file("src/b.ts", FILE_B);
    ws.llm.push_response(two_file_response());

    // Rebuild the runner's applier over a filesystem that fails the
    // second rename, after the first file has already committed.
    let Workspace {
        dir,
        bus,
        llm,
        retrieval,
        tests,
        runner,
    } = ws;
    let runner = Arc::try_unwrap(runner).ok().unwrap();
    let runner = Arc::new(runner.with_commit_fs(Box::new(FailNthRename {
        calls: Mutex::new(0),
        fail_at: 2,
    })));
    let ws = Workspace {
        dir,
        bus,
        llm,
        retrieval,
        tests,
        runner,
    };

    let resolver = ws.spawn_resolver(vec![]);
    let stage = ws.runner.run().await.unwrap();
    resolver.abort();
    assert_eq!(stage, MissionStage::MissionPaused);

    // Post-condition: workspace byte-identical to pre-apply state
    assert_eq!(ws.read_file("src/a.ts"), FILE_A);
    assert_eq!(ws.read_file("src/b.ts"), FILE_B);
    assert!(!ws.dir.path().join("src/a.ts.ordinex_temp").exists());
    assert!(!ws.dir.path().join("src/b.ts.ordinex_temp").exists());

    let kinds = ws.kinds();
    let failure_at = kinds.iter().position(|k| *k == "failure_detected").unwrap();
    let step_failed_at = kinds.iter().position(|k| *k == "step_failed").unwrap();
    assert!(failure_at < step_failed_at);
    assert_eq!(*kinds.last().unwrap(), "mission_paused");

    let events = ws.events();
    let (reason, rollback) = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::FailureDetected { reason, rollback, .. } => {
                Some((*reason, rollback.clone()))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(reason, FailureReason::ApplyFailed);
    assert_eq!(rollback.as_deref(), Some("succeeded"));
}
