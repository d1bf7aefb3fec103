//! Building sessions from configuration

use serde_json::json;
use tether_config::TetherConfig;
use tether_core::Session;
use tether_types::{Conversation, Message};

use crate::common::Workspace;

fn config(toml_str: &str) -> TetherConfig {
    toml::from_str(toml_str).unwrap()
}

#[test]
fn disabled_snapshot_removes_the_tool() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::from_config(dir.path(), &config("[snapshot]\nenabled = false\n")).unwrap();
    let mut ws = Workspace {
        dir,
        session: session.with_conversation(Conversation::from(vec![Message::user("q")])),
    };

    assert!(ws.session.tool_definitions().iter().all(|def| def.name != "snapshot"));
    let output = ws.call("tc_1", "snapshot", json!({"action": "status"}));
    assert_eq!(output, "error: unknown tool: snapshot");
}

#[test]
fn configured_history_cap_is_enforced() {
    let session = Session::from_config(".", &config("[snapshot]\nmax_history = 2\n")).unwrap();
    let mut session = session.with_conversation(Conversation::from(vec![Message::user("q")]));

    for round in 0..3 {
        session.push_message(Message::assistant(format!("step {round}")));
        session.restore(|_| Some(format!("summary {round}"))).unwrap();
    }

    let summaries: Vec<_> = session
        .snapshot()
        .history()
        .iter()
        .map(|entry| entry.summary.clone())
        .collect();
    assert_eq!(summaries, vec!["summary 1", "summary 2"]);
}

#[test]
fn invalid_values_fail_construction_with_context() {
    let Err(err) = Session::from_config(".", &config("[snapshot]\nmax_history = 0\n")) else {
        panic!("expected an invalid config error");
    };
    let chain = format!("{err:#}");
    assert!(chain.starts_with("invalid tether configuration"), "{chain}");
    assert!(chain.contains("snapshot.max_history = 0"), "{chain}");
}
