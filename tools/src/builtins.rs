//! Built-in file tools.
//!
//! All three go through the session's [`crate::FileAccessTracker`]: reads
//! record the path, writes and edits of existing files require a prior read
//! (or a prior write) and record the write on success.

use std::fmt::Write as _;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::edit;
use crate::snapshot_tool::SnapshotTool;
use crate::{ToolCtx, ToolError, ToolExecutor, ToolRegistry, parse_args, resolve_path};

#[derive(Debug, Default)]
pub struct ReadFileTool;

#[derive(Debug, Default)]
pub struct WriteFileTool;

#[derive(Debug, Default)]
pub struct EditFileTool;

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    file_path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct EditFileArgs {
    file_path: String,
    old_string: String,
    new_string: String,
    #[serde(default)]
    replace_all: bool,
}

fn require_path(raw: &str) -> Result<(), ToolError> {
    if raw.trim().is_empty() {
        return Err(ToolError::BadArgs {
            message: "file_path must not be empty".to_string(),
        });
    }
    Ok(())
}

fn io_failure(tool: &str, action: &str, path: &Path, err: &std::io::Error) -> ToolError {
    ToolError::ExecutionFailed {
        tool: tool.to_string(),
        message: format!("failed to {action} {}: {err}", path.display()),
    }
}

impl ToolExecutor for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read a text file with line numbers"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Absolute or working-directory-relative path" }
            },
            "required": ["file_path"]
        })
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute(&self, args: Value, ctx: &mut ToolCtx<'_>) -> Result<String, ToolError> {
        let typed: ReadFileArgs = parse_args(&args)?;
        require_path(&typed.file_path)?;
        let path = resolve_path(ctx.working_dir, &typed.file_path);

        let bytes = std::fs::read(&path).map_err(|e| io_failure(self.name(), "read", &path, &e))?;
        ctx.tracker.record_read(&path);
        Ok(format_with_line_numbers(&String::from_utf8_lossy(&bytes)))
    }
}

impl ToolExecutor for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write full content to a file, creating parent directories as needed. \
         Existing files must be read first."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "File to create or overwrite" },
                "content": { "type": "string", "description": "Full file content" }
            },
            "required": ["file_path", "content"],
            "additionalProperties": false
        })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute(&self, args: Value, ctx: &mut ToolCtx<'_>) -> Result<String, ToolError> {
        let typed: WriteFileArgs = parse_args(&args)?;
        require_path(&typed.file_path)?;
        let path = resolve_path(ctx.working_dir, &typed.file_path);

        let exists = path.exists();
        if ctx.enforce_read_before_write {
            ctx.tracker.check_write_allowed(&path, exists)?;
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| io_failure(self.name(), "create parent directories for", &path, &e))?;
        }
        std::fs::write(&path, typed.content.as_bytes())
            .map_err(|e| io_failure(self.name(), "write", &path, &e))?;
        ctx.tracker.record_write(&path);

        let verb = if exists { "Overwrote" } else { "Created" };
        Ok(format!("{verb} {} ({} bytes)", path.display(), typed.content.len()))
    }
}

impl ToolExecutor for EditFileTool {
    fn name(&self) -> &'static str {
        "edit_file"
    }

    fn description(&self) -> &'static str {
        "Replace old_string with new_string in an existing file. Tolerates \
         whitespace and typographic punctuation drift; refuses ambiguous matches \
         unless replace_all is set. The file must be read first."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "File to edit" },
                "old_string": { "type": "string", "description": "Text to find" },
                "new_string": { "type": "string", "description": "Replacement text" },
                "replace_all": { "type": "boolean", "default": false, "description": "Replace every occurrence" }
            },
            "required": ["file_path", "old_string", "new_string"],
            "additionalProperties": false
        })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute(&self, args: Value, ctx: &mut ToolCtx<'_>) -> Result<String, ToolError> {
        let typed: EditFileArgs = parse_args(&args)?;
        require_path(&typed.file_path)?;
        let path = resolve_path(ctx.working_dir, &typed.file_path);

        if !path.is_file() {
            return Err(ToolError::ExecutionFailed {
                tool: self.name().to_string(),
                message: format!(
                    "file not found: {}. Use write_file to create new files.",
                    path.display()
                ),
            });
        }
        if ctx.enforce_read_before_write {
            ctx.tracker.check_write_allowed(&path, true)?;
        }

        let original =
            std::fs::read_to_string(&path).map_err(|e| io_failure(self.name(), "read", &path, &e))?;
        let replaced = edit::replace(
            &original,
            &typed.old_string,
            &typed.new_string,
            typed.replace_all,
        )
        .map_err(|source| ToolError::EditFailed {
            path: path.clone(),
            source,
        })?;

        std::fs::write(&path, replaced.content.as_bytes())
            .map_err(|e| io_failure(self.name(), "write", &path, &e))?;
        ctx.tracker.record_write(&path);

        tracing::debug!(
            path = %path.display(),
            strategy = replaced.strategy.as_str(),
            replacements = replaced.replacements,
            "file edited"
        );
        Ok(format!(
            "Edited {} ({} replacement(s), {} match)",
            path.display(),
            replaced.replacements,
            replaced.strategy
        ))
    }
}

pub fn register_builtins(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    register_file_tools(registry)?;
    registry.register(Box::new(SnapshotTool))?;
    Ok(())
}

/// Register only the file tools, for sessions with snapshots turned off.
pub fn register_file_tools(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    registry.register(Box::new(ReadFileTool))?;
    registry.register(Box::new(WriteFileTool))?;
    registry.register(Box::new(EditFileTool))?;
    Ok(())
}

fn format_with_line_numbers(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let width = lines.len().to_string().len();
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let _ = writeln!(out, "{:>width$}| {line}", i + 1);
    }
    if !content.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }
    out
}
