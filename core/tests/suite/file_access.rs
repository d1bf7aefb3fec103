//! Read-before-write gating and edits through the session's tools

use serde_json::json;
use tether_config::SessionSettings;

use crate::common::Workspace;

#[test]
fn edit_requires_a_prior_read() {
    let mut ws = Workspace::new();
    ws.write("src/lib.rs", "pub fn answer() -> u32 {\n    41\n}\n");

    let blocked = ws.call(
        "tc_1",
        "edit_file",
        json!({"file_path": "src/lib.rs", "old_string": "41", "new_string": "42"}),
    );
    assert!(
        blocked.starts_with("error: cannot write to an existing file that hasn't been read first."),
        "{blocked}"
    );
    assert!(ws.read("src/lib.rs").contains("41"));

    ws.call("tc_2", "read_file", json!({"file_path": "src/lib.rs"}));
    let edited = ws.call(
        "tc_3",
        "edit_file",
        json!({"file_path": "src/lib.rs", "old_string": "41", "new_string": "42"}),
    );
    assert!(edited.ends_with("(1 replacement(s), exact match)"), "{edited}");
    assert_eq!(ws.read("src/lib.rs"), "pub fn answer() -> u32 {\n    42\n}\n");
}

#[test]
fn overwrite_requires_a_prior_read() {
    let mut ws = Workspace::new();
    ws.write("config.toml", "debug = false\n");

    let blocked = ws.call("tc_1", "write_file", json!({"file_path": "config.toml", "content": "x"}));
    assert!(blocked.contains("Use read_file"), "{blocked}");
    assert_eq!(ws.read("config.toml"), "debug = false\n");
}

#[test]
fn own_writes_can_be_edited() {
    let mut ws = Workspace::new();
    let created = ws.call(
        "tc_1",
        "write_file",
        json!({"file_path": "new/mod.rs", "content": "const A: u8 = 1;\n"}),
    );
    assert!(created.starts_with("Created "), "{created}");

    let edited = ws.call(
        "tc_2",
        "edit_file",
        json!({"file_path": "new/mod.rs", "old_string": "= 1", "new_string": "= 2"}),
    );
    assert!(edited.starts_with("Edited "), "{edited}");
    assert_eq!(ws.read("new/mod.rs"), "const A: u8 = 2;\n");
}

#[test]
fn typographic_drift_matches_via_normalized_pass() {
    let mut ws = Workspace::new();
    ws.write("main.rs", "fn main() {\n    println!(\u{201c}hi\u{201d});\n}\n");
    ws.call("tc_1", "read_file", json!({"file_path": "main.rs"}));

    let edited = ws.call(
        "tc_2",
        "edit_file",
        json!({
            "file_path": "main.rs",
            "old_string": "println!(\"hi\");",
            "new_string": "println!(\"bye\");"
        }),
    );
    assert!(edited.ends_with("normalized match)"), "{edited}");

    let content = ws.read("main.rs");
    assert!(content.starts_with("fn main() {\n"));
    assert!(content.contains("println!(\"bye\");"));
    assert!(!content.contains('\u{201c}'));
}

#[test]
fn ambiguous_edit_leaves_file_untouched() {
    let mut ws = Workspace::new();
    ws.write("a.txt", "a b a");
    ws.call("tc_1", "read_file", json!({"file_path": "a.txt"}));

    let failed = ws.call(
        "tc_2",
        "edit_file",
        json!({"file_path": "a.txt", "old_string": "a", "new_string": "z"}),
    );
    assert!(failed.starts_with("error: edit failed for "), "{failed}");
    assert!(failed.contains("matches 2 locations"), "{failed}");
    assert_eq!(ws.read("a.txt"), "a b a");

    let all = ws.call(
        "tc_3",
        "edit_file",
        json!({"file_path": "a.txt", "old_string": "a", "new_string": "z", "replace_all": true}),
    );
    assert!(all.contains("(2 replacement(s), exact match)"), "{all}");
    assert_eq!(ws.read("a.txt"), "z b z");
}

#[test]
fn missing_target_is_reported() {
    let mut ws = Workspace::new();
    ws.write("a.txt", "alpha\n");
    ws.call("tc_1", "read_file", json!({"file_path": "a.txt"}));

    let failed = ws.call(
        "tc_2",
        "edit_file",
        json!({"file_path": "a.txt", "old_string": "omega", "new_string": "beta"}),
    );
    assert!(failed.ends_with("old_string not found"), "{failed}");
}

#[test]
fn gating_can_be_disabled() {
    let settings = SessionSettings {
        enforce_read_before_write: false,
        ..SessionSettings::default()
    };
    let mut ws = Workspace::with_settings(settings);
    ws.write("a.txt", "old\n");

    let edited = ws.call(
        "tc_1",
        "edit_file",
        json!({"file_path": "a.txt", "old_string": "old", "new_string": "new"}),
    );
    assert!(edited.starts_with("Edited "), "{edited}");
}

#[test]
fn clear_forgets_reads() {
    let mut ws = Workspace::new();
    ws.write("a.txt", "old\n");
    ws.call("tc_1", "read_file", json!({"file_path": "a.txt"}));
    assert!(ws.session.tracker().was_read(&ws.path("a.txt")));

    ws.session.clear();
    assert!(!ws.session.tracker().was_read(&ws.path("a.txt")));

    let blocked = ws.call(
        "tc_2",
        "edit_file",
        json!({"file_path": "a.txt", "old_string": "old", "new_string": "new"}),
    );
    assert!(blocked.starts_with("error: cannot write"), "{blocked}");
}
