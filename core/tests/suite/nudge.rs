//! Read-streak nudge behavior across tool batches

use serde_json::json;
use tether_config::SessionSettings;
use tether_core::SystemNotification;
use tether_types::Message;

use crate::common::Workspace;

fn reads(ws: &mut Workspace, prefix: &str, count: usize) {
    for i in 0..count {
        ws.call(&format!("{prefix}{i}"), "read_file", json!({"file_path": "a.txt"}));
    }
}

fn workspace(settings: SessionSettings) -> Workspace {
    let mut ws = Workspace::with_settings(settings);
    ws.write("a.txt", "a\n");
    ws.session.on_loop_entry();
    ws
}

#[test]
fn nudges_once_per_read_streak() {
    let mut ws = workspace(SessionSettings::default());
    reads(&mut ws, "r", 4);
    assert!(ws.session.take_notifications().is_empty());

    reads(&mut ws, "s", 1);
    assert_eq!(
        ws.session.take_notifications(),
        vec![SystemNotification::SnapshotNudge { read_batches: 5 }]
    );

    reads(&mut ws, "t", 6);
    assert!(ws.session.take_notifications().is_empty());
}

#[test]
fn mutation_resets_the_streak() {
    let mut ws = workspace(SessionSettings::default());
    reads(&mut ws, "r", 4);
    ws.call("tc_w", "write_file", json!({"file_path": "b.txt", "content": "b"}));
    reads(&mut ws, "s", 4);
    assert!(ws.session.take_notifications().is_empty());

    reads(&mut ws, "t", 1);
    assert_eq!(ws.session.take_notifications().len(), 1);
}

#[test]
fn mixed_batch_counts_as_mutating() {
    let mut ws = workspace(SessionSettings::default());
    reads(&mut ws, "r", 4);
    ws.turn(&[
        ("m1", "read_file", json!({"file_path": "a.txt"})),
        ("m2", "write_file", json!({"file_path": "c.txt", "content": "c"})),
    ]);
    reads(&mut ws, "s", 1);
    assert!(ws.session.take_notifications().is_empty());
}

#[test]
fn restore_resets_the_streak() {
    let mut ws = workspace(SessionSettings::default());
    reads(&mut ws, "r", 4);
    ws.call("tc_s", "snapshot", json!({"action": "restore", "summary": "a.txt is trivial"}));
    reads(&mut ws, "s", 4);
    assert!(ws.session.take_notifications().is_empty());
}

#[test]
fn new_user_turn_resets_the_streak() {
    let mut ws = workspace(SessionSettings::default());
    reads(&mut ws, "r", 4);
    ws.session.push_message(Message::user("and now?"));
    ws.session.on_loop_entry();
    reads(&mut ws, "s", 4);
    assert!(ws.session.take_notifications().is_empty());
}

#[test]
fn threshold_is_configurable() {
    let settings = SessionSettings {
        nudge_after_read_turns: 2,
        ..SessionSettings::default()
    };
    let mut ws = workspace(settings);
    reads(&mut ws, "r", 2);
    let notes = ws.session.take_notifications();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].format().contains("2 read-only tool rounds"));
}

#[test]
fn no_nudge_when_snapshots_are_disabled() {
    let settings = SessionSettings {
        snapshot_enabled: false,
        ..SessionSettings::default()
    };
    let mut ws = workspace(settings);
    reads(&mut ws, "r", 8);
    assert!(ws.session.take_notifications().is_empty());
}
