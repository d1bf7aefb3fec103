//! The `snapshot` tool: model-facing surface of the snapshot engine.
//!
//! Every successful call returns a JSON object carrying `action` and
//! `status`. Failures surface as `error: ...` strings through
//! [`crate::ToolRegistry::dispatch`].

use serde::Deserialize;
use serde_json::{Value, json};
use tether_context::{
    CancelOutcome, MAX_LABEL_CHARS, MAX_SUMMARY_CHARS, RestoreOutcome, RestoreRequest,
    SnapshotStatus,
};

use crate::{ToolCtx, ToolError, ToolExecutor, parse_args};

#[derive(Debug, Default)]
pub struct SnapshotTool;

/// Unknown fields are ignored; a missing `action` is reported as invalid.
#[derive(Debug, Deserialize)]
struct SnapshotArgs {
    #[serde(default)]
    action: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    force: bool,
}

impl ToolExecutor for SnapshotTool {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn description(&self) -> &'static str {
        "Collapse finished investigation into a short summary to free context. \
         `save` marks a checkpoint, `restore` replaces everything since the checkpoint \
         (or since your last user message) with your summary, `cancel` drops the \
         checkpoint, `status` reports state."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["save", "restore", "cancel", "status"],
                    "description": "Operation to perform."
                },
                "label": {
                    "type": "string",
                    "maxLength": MAX_LABEL_CHARS,
                    "description": "Checkpoint name (save only)."
                },
                "summary": {
                    "type": "string",
                    "maxLength": MAX_SUMMARY_CHARS,
                    "description": "What you learned; replaces the collapsed turns (restore only)."
                },
                "force": {
                    "type": "boolean",
                    "default": false,
                    "description": "Restore even if files were modified since the checkpoint."
                }
            },
            "required": ["action"]
        })
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute(&self, args: Value, ctx: &mut ToolCtx<'_>) -> Result<String, ToolError> {
        let typed: SnapshotArgs = parse_args(&args)?;
        let response = match typed.action.as_str() {
            "save" => {
                ctx.snapshot.save(&typed.label, ctx.tool_call_id)?;
                json!({"action": "save", "label": typed.label, "status": "checkpoint_set"})
            }
            "restore" => {
                let Some(conversation) = ctx.conversation.as_deref_mut() else {
                    return Err(ToolError::MissingConversation);
                };
                let request = RestoreRequest::new(&typed.summary)
                    .force(typed.force)
                    .tool_call_id(ctx.tool_call_id);
                match ctx.snapshot.restore(conversation, request)? {
                    RestoreOutcome::Collapsed(report) => json!({
                        "action": "restore",
                        "status": "collapsed",
                        "label": report.label,
                        "scope_type": report.scope_type,
                        "turns_collapsed": report.turns_collapsed,
                        "tokens_saved": report.tokens_saved,
                        "forced": report.forced,
                    }),
                    RestoreOutcome::EmptyScope => json!({
                        "action": "restore",
                        "status": "warning",
                        "message": "empty scope, nothing to collapse",
                    }),
                }
            }
            "cancel" => match ctx.snapshot.cancel() {
                CancelOutcome::Cleared { label } => {
                    json!({"action": "cancel", "status": "cleared", "label": label})
                }
                CancelOutcome::NoCheckpoint => json!({
                    "action": "cancel",
                    "status": "no_checkpoint",
                    "message": "no explicit checkpoint to cancel",
                }),
            },
            "status" => status_response(&ctx.snapshot.status()),
            other => {
                return Err(ToolError::InvalidAction {
                    action: other.to_string(),
                });
            }
        };
        Ok(response.to_string())
    }
}

fn status_response(status: &SnapshotStatus) -> Value {
    json!({
        "action": "status",
        "status": "ok",
        "explicit_active": status.explicit_active,
        "explicit_label": status.explicit_label,
        "anchor": status.anchor,
        "dirty": status.dirty,
        "dirty_tools": status.dirty_tools,
        "history_count": status.history_count,
        "stats": status.stats,
    })
}
