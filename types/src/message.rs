//! Core message domain model.
//!
//! A `Message` is one transcript entry in the chat-completions shape.
//! Role-specific fields are only reachable through role-specific
//! constructors: a tool result never carries tool calls, and only tool
//! results answer a tool call.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool invocation requested by an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ToolCallWire", into = "ToolCallWire")]
pub struct ToolCall {
    /// Unique identifier for this tool call (used to match results).
    pub id: String,
    /// The name of the tool being called.
    pub name: String,
    /// Raw JSON arguments exactly as the model produced them.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ToolCallWire {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionWire,
}

#[derive(Serialize, Deserialize)]
struct FunctionWire {
    name: String,
    /// Usually a JSON-encoded string; some providers send the object itself.
    #[serde(default)]
    arguments: Value,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<ToolCallWire> for ToolCall {
    fn from(wire: ToolCallWire) -> Self {
        let arguments = match wire.function.arguments {
            Value::String(raw) => raw,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            id: wire.id,
            name: wire.function.name,
            arguments,
        }
    }
}

impl From<ToolCall> for ToolCallWire {
    fn from(call: ToolCall) -> Self {
        Self {
            id: call.id,
            kind: function_kind(),
            function: FunctionWire {
                name: call.name,
                arguments: Value::String(call.arguments),
            },
        }
    }
}

/// Role/field combinations rejected when ingesting external messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("tool_calls are only valid on assistant messages (found on {role})")]
    ToolCallsOnNonAssistant { role: Role },
    #[error("tool_call_id is only valid on tool messages (found on {role})")]
    ToolCallIdOnNonTool { role: Role },
    #[error("tool message is missing tool_call_id")]
    MissingToolCallId,
}

/// A single conversation entry.
///
/// `restore_marker` tags synthetic recap messages with the id of the restore
/// that produced them. It is engine-private bookkeeping: it never reaches the
/// wire and is deliberately distinct from `tool_call_id`, so a recap is never
/// mistaken for a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MessageWire", into = "MessageWire")]
pub struct Message {
    role: Role,
    content: String,
    tool_calls: Vec<ToolCall>,
    tool_call_id: Option<String>,
    restore_marker: Option<String>,
}

impl Message {
    fn bare(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            restore_marker: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::bare(Role::System, content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::bare(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::bare(Role::Assistant, content.into())
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::bare(Role::Assistant, content.into())
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::bare(Role::Tool, content.into())
        }
    }

    /// Synthetic assistant recap standing in for a collapsed span.
    pub fn recap(content: impl Into<String>, restore_marker: Option<String>) -> Self {
        Self {
            restore_marker,
            ..Self::bare(Role::Assistant, content.into())
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// True for an assistant message that is waiting on tool responses.
    #[must_use]
    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }

    #[must_use]
    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }

    #[must_use]
    pub fn restore_marker(&self) -> Option<&str> {
        self.restore_marker.as_deref()
    }
}

#[derive(Serialize, Deserialize)]
struct MessageWire {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl TryFrom<MessageWire> for Message {
    type Error = MessageError;

    fn try_from(wire: MessageWire) -> Result<Self, Self::Error> {
        let MessageWire {
            role,
            content,
            tool_calls,
            tool_call_id,
        } = wire;

        if !tool_calls.is_empty() && role != Role::Assistant {
            return Err(MessageError::ToolCallsOnNonAssistant { role });
        }
        match (role, &tool_call_id) {
            (Role::Tool, None) => return Err(MessageError::MissingToolCallId),
            (Role::System | Role::User | Role::Assistant, Some(_)) => {
                return Err(MessageError::ToolCallIdOnNonTool { role });
            }
            _ => {}
        }

        Ok(Self {
            role,
            content: content.unwrap_or_default(),
            tool_calls,
            tool_call_id,
            restore_marker: None,
        })
    }
}

impl From<Message> for MessageWire {
    fn from(message: Message) -> Self {
        // Providers expect `content: null` on a pure tool-call turn.
        let content = if message.content.is_empty() && !message.tool_calls.is_empty() {
            None
        } else {
            Some(message.content)
        };
        Self {
            role: message.role,
            content,
            tool_calls: message.tool_calls,
            tool_call_id: message.tool_call_id,
        }
    }
}
