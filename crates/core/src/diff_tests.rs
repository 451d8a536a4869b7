// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn proposal() -> DiffProposal {
    DiffProposal {
        diff_id: DiffId::new("d-1"),
        touched_files: vec![
            TouchedFile {
                path: PathBuf::from("src/app.ts"),
                action: FileAction::Update,
                base_sha: Some("a1b2c3d4e5f6".to_string()),
                new_content: None,
                lines_added: 3,
                lines_removed: 1,
            },
            TouchedFile {
                path: PathBuf::from("src/new.ts"),
                action: FileAction::Create,
                base_sha: None,
                new_content: Some("export const x = 1;\n".to_string()),
                lines_added: 1,
                lines_removed: 0,
            },
        ],
        unified_diff: String::new(),
    }
}

#[test]
fn expected_shas_skips_creates() {
    let shas = proposal().expected_shas();
    assert_eq!(shas.len(), 1);
    assert_eq!(
        shas.get(&PathBuf::from("src/app.ts")).map(String::as_str),
        Some("a1b2c3d4e5f6")
    );
}

#[test]
fn paths_lists_every_touched_file() {
    assert_eq!(
        proposal().paths(),
        vec![PathBuf::from("src/app.ts"), PathBuf::from("src/new.ts")]
    );
}

#[test]
fn total_changed_lines_sums_all_files() {
    assert_eq!(proposal().total_changed_lines(), 5);
}

#[test]
fn file_action_wire_format() {
    assert_eq!(serde_json::to_value(FileAction::Create).unwrap(), "create");
    assert_eq!(serde_json::to_value(FileAction::Update).unwrap(), "update");
    assert_eq!(serde_json::to_value(FileAction::Delete).unwrap(), "delete");
}
