//! Shared fixtures for session integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::Value;
use tempfile::TempDir;
use tether_config::SessionSettings;
use tether_core::Session;
use tether_types::{Conversation, Message, ToolCall};

/// A session rooted in a scratch directory.
pub struct Workspace {
    pub dir: TempDir,
    pub session: Session,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_settings(SessionSettings::default())
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(dir.path(), settings)
            .unwrap()
            .with_conversation(Conversation::from(vec![
                Message::system("You are a careful coding agent."),
                Message::user("debug auth"),
            ]));
        Self { dir, session }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).unwrap()
    }

    /// Append an assistant message requesting `calls`, run them, and return
    /// the tool outputs in call order.
    pub fn turn(&mut self, calls: &[(&str, &str, Value)]) -> Vec<String> {
        let tool_calls = calls
            .iter()
            .map(|(id, name, args)| call(id, name, args))
            .collect();
        self.session
            .push_message(Message::assistant_with_tool_calls("", tool_calls));
        let ran = self.session.run_pending_tool_calls();
        assert_eq!(ran, calls.len());

        let messages = self.session.conversation().messages();
        messages[messages.len() - ran..]
            .iter()
            .map(|message| message.content().to_string())
            .collect()
    }

    /// Single-call convenience over [`Workspace::turn`].
    pub fn call(&mut self, id: &str, name: &str, args: Value) -> String {
        self.turn(&[(id, name, args)]).remove(0)
    }
}

pub fn call(id: &str, name: &str, args: &Value) -> ToolCall {
    ToolCall::new(id, name, args.to_string())
}

pub fn parse(output: &str) -> Value {
    serde_json::from_str(output)
        .unwrap_or_else(|e| panic!("tool output is not JSON ({e}): {output}"))
}

pub fn assert_tool_refs_resolve(conversation: &Conversation) {
    if let Err(dangling) = conversation.check_tool_call_refs() {
        panic!("{dangling}");
    }
}

/// `[system, user, read, result, read, result]`.
pub fn investigation_transcript() -> Conversation {
    Conversation::from(vec![
        Message::system("sys"),
        Message::user("debug auth"),
        Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("tc_1", "read_file", r#"{"file_path":"auth.py"}"#)],
        ),
        Message::tool_result("tc_1", "def authenticate(token): return jwt.decode(token)"),
        Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("tc_2", "read_file", r#"{"file_path":"jwt.py"}"#)],
        ),
        Message::tool_result("tc_2", "def decode(token): check_expiry(token)"),
    ])
}
