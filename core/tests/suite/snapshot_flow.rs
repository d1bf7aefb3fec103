//! Snapshot save/restore through a full session

use serde_json::json;
use tether_context::{RestoreOutcome, SNAPSHOT_HISTORY_SENTINEL, ScopeType};
use tether_core::Session;
use tether_config::SessionSettings;
use tether_types::{Message, Role};

use crate::common::{Workspace, assert_tool_refs_resolve, investigation_transcript, parse};

#[test]
fn interactive_restore_collapses_investigation() {
    let mut session = Session::new(".", SessionSettings::default())
        .unwrap()
        .with_conversation(investigation_transcript());

    let mut seen_scope = String::new();
    let outcome = session
        .restore(|scope| {
            seen_scope = scope.to_string();
            Some("Auth uses JWT".to_string())
        })
        .unwrap();

    let RestoreOutcome::Collapsed(report) = outcome else {
        panic!("expected a collapse");
    };
    assert_eq!(report.turns_collapsed, 4);
    assert_eq!(report.scope_type, ScopeType::Implicit);
    assert!(seen_scope.contains("read_file"));
    assert!(seen_scope.contains("check_expiry"));

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content(), "debug auth");
    assert_eq!(messages[2].role(), Role::Assistant);
    assert!(messages[2].tool_calls().is_empty());
    assert!(messages[2].content().contains("Auth uses JWT"));
    assert_eq!(session.snapshot().history().latest().unwrap().turns_collapsed, 4);
    assert_tool_refs_resolve(session.conversation());
}

#[test]
fn tool_restore_keeps_the_pending_call() {
    let mut ws = Workspace::new();
    ws.write("auth.py", "def authenticate(token):\n    return jwt.decode(token)\n");

    ws.call("tc_1", "read_file", json!({"file_path": "auth.py"}));
    ws.call("tc_2", "read_file", json!({"file_path": "auth.py"}));
    let output = parse(&ws.call(
        "tc_3",
        "snapshot",
        json!({"action": "restore", "summary": "authenticate() delegates to jwt.decode"}),
    ));

    assert_eq!(output["status"], "collapsed");
    assert_eq!(output["turns_collapsed"], 4);
    assert_eq!(output["forced"], false);

    let messages = ws.session.conversation().messages();
    assert_eq!(messages.len(), 5);
    assert!(
        messages[2]
            .content()
            .starts_with("[snapshot: investigation]\nauthenticate() delegates to jwt.decode\n")
    );
    assert_eq!(messages[3].tool_calls()[0].id, "tc_3");
    assert_eq!(messages[4].tool_call_id(), Some("tc_3"));
    assert_tool_refs_resolve(ws.session.conversation());
}

#[test]
fn explicit_checkpoint_limits_the_scope() {
    let mut ws = Workspace::new();
    ws.write("notes.txt", "one\ntwo\n");

    let saved = parse(&ws.call("tc_s", "snapshot", json!({"action": "save", "label": "auth-probe"})));
    assert_eq!(saved["status"], "checkpoint_set");

    ws.call("tc_r", "read_file", json!({"file_path": "notes.txt"}));
    let output = parse(&ws.call(
        "tc_x",
        "snapshot",
        json!({"action": "restore", "summary": "notes has two lines"}),
    ));
    assert_eq!(output["scope_type"], "explicit");
    assert_eq!(output["label"], "auth-probe");
    assert_eq!(output["turns_collapsed"], 2);

    let messages = ws.session.conversation().messages();
    assert_eq!(messages.len(), 7);
    assert_eq!(messages[3].tool_call_id(), Some("tc_s"));
    assert!(messages[4].content().starts_with("[snapshot: auth-probe]"));
    assert!(ws.session.snapshot().explicit_checkpoint().is_none());
    assert_tool_refs_resolve(ws.session.conversation());
}

#[test]
fn dirty_scope_blocks_until_forced() {
    let mut ws = Workspace::new();

    ws.call("tc_w", "write_file", json!({"file_path": "out.txt", "content": "draft"}));
    let blocked = ws.call("tc_r", "snapshot", json!({"action": "restore", "summary": "wrote a draft"}));
    assert!(blocked.starts_with("error: scope is dirty (write_file)."), "{blocked}");
    assert_eq!(ws.session.snapshot().stats().blocked, 1);

    let forced = parse(&ws.call(
        "tc_f",
        "snapshot",
        json!({"action": "restore", "summary": "wrote a draft", "force": true}),
    ));
    assert_eq!(forced["status"], "collapsed");
    assert_eq!(forced["forced"], true);

    let snapshot = ws.session.snapshot();
    assert!(!snapshot.is_dirty());
    assert_eq!(snapshot.stats().force_restores, 1);
    assert!(snapshot.history().latest().unwrap().forced_restore);
    assert_tool_refs_resolve(ws.session.conversation());
}

#[test]
fn second_restore_starts_after_the_first() {
    let mut ws = Workspace::new();
    ws.write("a.txt", "a\n");

    ws.call("tc_1", "read_file", json!({"file_path": "a.txt"}));
    ws.call("tc_2", "snapshot", json!({"action": "restore", "summary": "first"}));
    assert_eq!(ws.session.conversation().len(), 5);

    ws.call("tc_3", "read_file", json!({"file_path": "a.txt"}));
    let second = parse(&ws.call("tc_4", "snapshot", json!({"action": "restore", "summary": "second"})));
    assert_eq!(second["turns_collapsed"], 2);

    let messages = ws.session.conversation().messages();
    assert_eq!(messages.len(), 8);
    assert!(messages[2].content().contains("first"));
    assert!(messages[5].content().contains("second"));
    assert_eq!(ws.session.snapshot().history().len(), 2);
    assert_tool_refs_resolve(ws.session.conversation());
}

#[test]
fn restore_never_dangles_tool_results() {
    let mut ws = Workspace::new();
    ws.write("lib.rs", "fn a() {}\n");

    for round in 0..6 {
        let before = ws.session.conversation().len();
        let (first_id, second_id) = (format!("r{round}a"), format!("r{round}b"));
        ws.turn(&[
            (first_id.as_str(), "read_file", json!({"file_path": "lib.rs"})),
            (second_id.as_str(), "read_file", json!({"file_path": "lib.rs"})),
        ]);
        if round % 2 == 1 {
            ws.call(
                &format!("w{round}"),
                "write_file",
                json!({"file_path": "lib.rs", "content": format!("fn a{round}() {{}}\n")}),
            );
        }
        ws.call(
            &format!("s{round}"),
            "snapshot",
            json!({"action": "restore", "summary": format!("round {round}"), "force": true}),
        );
        assert_tool_refs_resolve(ws.session.conversation());
        // recap + restore call + its result replace at least the read turn
        assert!(ws.session.conversation().len() <= before + 3);
    }
    assert_eq!(ws.session.snapshot().stats().restores, 6);
}

#[test]
fn sessions_do_not_share_state() {
    let mut first = Workspace::new();
    let mut second = Workspace::new();

    first.call("tc_s", "snapshot", json!({"action": "save", "label": "mine"}));
    let status = parse(&second.call("tc_q", "snapshot", json!({"action": "status"})));
    assert_eq!(status["explicit_active"], false);
    assert_eq!(status["stats"]["saves"], 0);

    first.write("shared.txt", "x\n");
    first.call("tc_r", "read_file", json!({"file_path": "shared.txt"}));
    assert!(first.session.tracker().was_read(&first.path("shared.txt")));
    assert!(!second.session.tracker().was_read(&first.path("shared.txt")));
}

#[test]
fn history_is_injected_once_on_loop_entry() {
    let mut ws = Workspace::new();
    ws.write("a.txt", "a\n");
    ws.call("tc_1", "read_file", json!({"file_path": "a.txt"}));
    ws.call("tc_2", "snapshot", json!({"action": "restore", "summary": "a.txt holds one line"}));

    ws.session.push_message(Message::user("next question"));
    ws.session.on_loop_entry();
    ws.session.on_loop_entry();

    let system = ws.session.conversation().messages()[0].content().to_string();
    assert!(system.starts_with("You are a careful coding agent.\n\n"));
    assert_eq!(system.matches(SNAPSHOT_HISTORY_SENTINEL).count(), 1);
    assert!(system.contains("a.txt holds one line"));

    ws.session.clear();
    let messages = ws.session.conversation().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content(), "You are a careful coding agent.");
}

#[test]
fn interactive_checkpoint_then_restore() {
    let mut ws = Workspace::new();
    ws.session.push_message(Message::assistant("Looking into it."));
    ws.session.save_checkpoint("manual").unwrap();
    ws.session.push_message(Message::assistant("Tried A, failed."));
    ws.session.push_message(Message::assistant("Tried B, failed."));

    let outcome = ws.session.restore(|_| None).unwrap();
    let RestoreOutcome::Collapsed(report) = outcome else {
        panic!("expected a collapse");
    };
    assert_eq!(report.label, "manual");
    assert_eq!(report.turns_collapsed, 2);

    let messages = ws.session.conversation().messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].content(), "Looking into it.");
    assert!(messages[3].content().contains("(context collapsed by user)"));
}

#[test]
fn report_serializes_stats() {
    let mut ws = Workspace::new();
    ws.session.push_message(Message::assistant("Long exploration ".repeat(40)));
    ws.session.restore(|_| Some("short".to_string())).unwrap();

    let report = ws.session.report();
    let line = report.summary_line.clone().unwrap();
    assert!(line.starts_with("snapshot: 1 restore(s), ~"), "{line}");

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["snapshot"]["restores"], 1);
    assert_eq!(value["history_count"], 1);
    assert_eq!(value["messages"], 3);
}
