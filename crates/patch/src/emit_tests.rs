// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parser::parse;

#[test]
fn emit_renders_canonical_form() {
    let files = parse(
        "\
--- a/src/app.ts
+++ b/src/app.ts
@@ -1,3 +1,3 @@
 ctx
-old
+new
",
    )
    .unwrap();
    let text = emit(&files);
    assert!(text.starts_with("--- a/src/app.ts\n+++ b/src/app.ts\n@@ -1,3 +1,3 @@\n"));
    assert!(text.contains(" ctx\n-old\n+new\n"));
}

#[test]
fn emit_uses_dev_null_for_creates() {
    let files = parse(
        "\
--- /dev/null
+++ b/src/new.ts
@@ -0,0 +1,1 @@
+x
",
    )
    .unwrap();
    let text = emit(&files);
    assert!(text.starts_with("--- /dev/null\n+++ b/src/new.ts\n"));
}

#[test]
fn parse_emit_round_trips() {
    let input = "\
--- a/src/a.ts
+++ b/src/a.ts
@@ -1,2 +1,2 @@
 keep
-drop
+add
--- /dev/null
+++ b/src/b.ts
@@ -0,0 +1,1 @@
+created
";
    let files = parse(input).unwrap();
    let emitted = emit(&files);
    let reparsed = parse(&emitted).unwrap();
    assert_eq!(reparsed, files);
}
