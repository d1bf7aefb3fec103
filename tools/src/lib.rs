//! Tool executor framework - core types, the edit and access-guard engines,
//! and the built-in tools that use them.
//!
//! Tools run synchronously, one call at a time, against state borrowed from
//! the owning session through [`ToolCtx`].

pub mod builtins;
pub mod edit;
pub mod snapshot_tool;
pub mod tracker;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tether_context::{SnapshotEngine, SnapshotError};
use tether_types::{Conversation, ToolCall};

pub use builtins::{
    EditFileTool, ReadFileTool, WriteFileTool, register_builtins, register_file_tools,
};
pub use edit::{MatchStrategy, ReplaceError, Replacement, replace};
pub use snapshot_tool::SnapshotTool;
pub use tracker::{FileAccessTracker, WriteBlocked};

/// Error types for tool execution.
///
/// `Display` output is returned to the model behind an `error: ` prefix (see
/// [`format_tool_error`]), so every message says what to do next.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("bad tool args: {message}")]
    BadArgs { message: String },
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("duplicate tool registered: {name}")]
    DuplicateTool { name: String },
    #[error("invalid action '{action}', expected one of: cancel, restore, save, status")]
    InvalidAction { action: String },
    #[error("restore requires access to the message list")]
    MissingConversation,
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("edit failed for {}: {source}", path.display())]
    EditFailed {
        path: PathBuf,
        #[source]
        source: ReplaceError,
    },
    #[error(transparent)]
    WriteBlocked(#[from] WriteBlocked),
    #[error("{tool} failed: {message}")]
    ExecutionFailed { tool: String, message: String },
}

/// Render a tool failure in the `error: ...` convention the model reads.
#[must_use]
pub fn format_tool_error(err: &ToolError) -> String {
    format!("error: {err}")
}

/// Session state a tool may read or mutate while it runs.
pub struct ToolCtx<'a> {
    pub working_dir: &'a Path,
    /// Id of the tool call being executed.
    pub tool_call_id: Option<&'a str>,
    /// The live transcript, when the caller grants access to it.
    pub conversation: Option<&'a mut Conversation>,
    pub snapshot: &'a mut SnapshotEngine,
    pub tracker: &'a mut FileAccessTracker,
    pub enforce_read_before_write: bool,
}

/// A named tool the model can call.
pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Value;
    /// Whether a call can change the workspace. Must agree with
    /// [`tether_context::is_read_only`].
    fn is_side_effecting(&self) -> bool;
    fn execute(&self, args: Value, ctx: &mut ToolCtx<'_>) -> Result<String, ToolError>;
}

pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone()).map_err(|e| ToolError::BadArgs {
        message: e.to_string(),
    })
}

/// Resolve a model-supplied path against the working directory.
///
/// `.` components are dropped so equivalent spellings share one tracker key.
pub(crate) fn resolve_path(working_dir: &Path, raw: &str) -> PathBuf {
    let joined = working_dir.join(raw);
    joined
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Tool manifest entry sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of tool executors, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    executors: HashMap<String, Box<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn register(&mut self, executor: Box<dyn ToolExecutor>) -> Result<(), ToolError> {
        let name = executor.name().to_string();
        if self.executors.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.executors.insert(name, executor);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&dyn ToolExecutor, ToolError> {
        self.executors
            .get(name)
            .map(std::convert::AsRef::as_ref)
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .executors
            .values()
            .map(|exec| ToolDefinition {
                name: exec.name().to_string(),
                description: exec.description().to_string(),
                parameters: exec.schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Run one tool call and return the text handed back to the model.
    ///
    /// Failures never escape: they come back as `error: ...` strings.
    pub fn dispatch(&self, call: &ToolCall, ctx: &mut ToolCtx<'_>) -> String {
        match self.execute(call, ctx) {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(tool = %call.name, error = %err, "tool call failed");
                format_tool_error(&err)
            }
        }
    }

    fn execute(&self, call: &ToolCall, ctx: &mut ToolCtx<'_>) -> Result<String, ToolError> {
        let executor = self.lookup(&call.name)?;
        let args = if call.arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.arguments).map_err(|e| ToolError::BadArgs {
                message: format!("arguments are not valid JSON: {e}"),
            })?
        };
        executor.execute(args, ctx)
    }
}
