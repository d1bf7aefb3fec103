//! One agent session: the transcript plus every engine that guards it.
//!
//! Nothing here is shared or global. Each [`Session`] owns its own
//! conversation, snapshot engine, access tracker and tool registry, so two
//! sessions can never observe each other's checkpoints or read sets.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tether_config::{SessionSettings, TetherConfig};
use tether_context::{
    RestoreOutcome, SnapshotEngine, SnapshotError, SnapshotStats, inject_history_block,
    is_read_only,
};
use tether_tools::{
    FileAccessTracker, ToolCtx, ToolDefinition, ToolError, ToolRegistry, register_builtins,
    register_file_tools,
};
use tether_types::{Conversation, Message, Role, ToolCall};

use crate::notifications::{NotificationQueue, SystemNotification};
use crate::nudge::ReadStreak;

/// Serializable end-of-session numbers for the reporting layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub snapshot: SnapshotStats,
    pub summary_line: Option<String>,
    pub history_count: usize,
    pub messages: usize,
    pub estimated_tokens: usize,
}

pub struct Session {
    working_dir: PathBuf,
    settings: SessionSettings,
    conversation: Conversation,
    snapshot: SnapshotEngine,
    tracker: FileAccessTracker,
    registry: ToolRegistry,
    read_streak: ReadStreak,
    notifications: NotificationQueue,
}

impl Session {
    pub fn new(working_dir: impl Into<PathBuf>, settings: SessionSettings) -> Result<Self, ToolError> {
        let mut registry = ToolRegistry::default();
        if settings.snapshot_enabled {
            register_builtins(&mut registry)?;
        } else {
            register_file_tools(&mut registry)?;
        }

        Ok(Self {
            working_dir: working_dir.into(),
            settings,
            conversation: Conversation::new(),
            snapshot: SnapshotEngine::new(settings.limits),
            tracker: FileAccessTracker::new(),
            registry,
            read_streak: ReadStreak::new(settings.nudge_after_read_turns),
            notifications: NotificationQueue::new(),
        })
    }

    pub fn from_config(working_dir: impl Into<PathBuf>, config: &TetherConfig) -> anyhow::Result<Self> {
        let settings = config.resolve().context("invalid tether configuration")?;
        Self::new(working_dir, settings).context("failed to register session tools")
    }

    /// Build a session from `~/.tether/config.toml`, or defaults when the
    /// file does not exist.
    pub fn from_default_config(working_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let config = TetherConfig::load()
            .context("failed to load tether configuration")?
            .unwrap_or_default();
        Self::from_config(working_dir, &config)
    }

    /// Start from an existing transcript.
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = conversation;
        self
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    #[must_use]
    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[must_use]
    pub fn snapshot(&self) -> &SnapshotEngine {
        &self.snapshot
    }

    #[must_use]
    pub fn tracker(&self) -> &FileAccessTracker {
        &self.tracker
    }

    #[must_use]
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Append a message. Appending never shifts existing indices, so index
    /// checkpoints stay valid.
    pub fn push_message(&mut self, message: Message) {
        self.conversation.push(message);
    }

    // ------------------------------------------------------------------
    // Agent loop hooks
    // ------------------------------------------------------------------

    /// Called each time the host loop is about to request a model turn.
    ///
    /// The dirty set is cleared only when the transcript ends in a user
    /// message. A continuation after tool results keeps pending mutations
    /// visible to the next restore.
    pub fn on_loop_entry(&mut self) {
        let fresh_turn = self
            .conversation
            .last()
            .is_some_and(|message| message.role() == Role::User);
        if fresh_turn {
            self.snapshot.reset_dirty();
            self.read_streak.reset();
        }
        self.refresh_system_prompt();
    }

    /// Execute one tool call and classify it for the dirty set.
    ///
    /// The tool result is returned, not appended; see
    /// [`Session::run_pending_tool_calls`] for the full batch flow.
    pub fn execute_tool_call(&mut self, call: &ToolCall) -> String {
        let mut ctx = ToolCtx {
            working_dir: &self.working_dir,
            tool_call_id: Some(call.id.as_str()),
            conversation: Some(&mut self.conversation),
            snapshot: &mut self.snapshot,
            tracker: &mut self.tracker,
            enforce_read_before_write: self.settings.enforce_read_before_write,
        };
        let output = self.registry.dispatch(call, &mut ctx);
        self.snapshot.mark_mutating(&call.name);
        output
    }

    /// Run every tool call requested by the last assistant message and
    /// append one tool result per call. Returns the number of calls run.
    ///
    /// A restore inside the batch may collapse earlier messages; the
    /// requesting assistant message is always kept, so the results appended
    /// afterwards still answer it.
    pub fn run_pending_tool_calls(&mut self) -> usize {
        let Some(calls) = self
            .conversation
            .last()
            .filter(|message| message.requests_tools())
            .map(|message| message.tool_calls().to_vec())
        else {
            return 0;
        };

        let restores_before = self.snapshot.stats().restores;
        let mut read_only = true;
        for call in &calls {
            let output = self.execute_tool_call(call);
            self.conversation
                .push(Message::tool_result(call.id.clone(), output));
            read_only &= is_read_only(&call.name);
        }
        self.finish_tool_batch(read_only, restores_before);
        calls.len()
    }

    fn finish_tool_batch(&mut self, read_only: bool, restores_before: u64) {
        if self.snapshot.stats().restores > restores_before {
            self.read_streak.reset();
            return;
        }
        let nudge = self.read_streak.record_batch(read_only);
        tracing::debug!(read_only, read_streak = self.read_streak.streak(), "tool batch finished");
        if let Some(nudge) = nudge
            && self.settings.snapshot_enabled
        {
            self.notifications.push(nudge);
        }
    }

    pub fn take_notifications(&mut self) -> Vec<SystemNotification> {
        self.notifications.take()
    }

    /// Fold retained snapshot history into the leading system message,
    /// replacing any block injected earlier.
    pub fn refresh_system_prompt(&mut self) {
        let block = if self.settings.snapshot_enabled {
            self.snapshot.render_history()
        } else {
            None
        };
        if let Some(system) = self.conversation.system_mut() {
            let updated = inject_history_block(system.content(), block);
            if updated != system.content() {
                system.set_content(updated);
            }
        }
    }

    // ------------------------------------------------------------------
    // User commands
    // ------------------------------------------------------------------

    /// Interactive checkpoint at the current end of the transcript.
    pub fn save_checkpoint(&mut self, label: &str) -> Result<(), SnapshotError> {
        self.snapshot.save_at_index(label, self.conversation.len())
    }

    /// Interactive restore to the end of the transcript.
    ///
    /// `summarize` receives the rendered scope; `None` or blank output falls
    /// back to a fixed placeholder summary.
    pub fn restore<F>(&mut self, summarize: F) -> Result<RestoreOutcome, SnapshotError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let outcome = self
            .snapshot
            .restore_with_summarizer(&mut self.conversation, summarize)?;
        if matches!(outcome, RestoreOutcome::Collapsed(_)) {
            self.read_streak.reset();
        }
        Ok(outcome)
    }

    /// Let an outside party rewrite the transcript (compaction, pruning).
    ///
    /// Index checkpoints saved before the rewrite are invalidated afterwards.
    pub fn compact_with<F, R>(&mut self, rewrite: F) -> R
    where
        F: FnOnce(&mut Conversation) -> R,
    {
        let result = rewrite(&mut self.conversation);
        self.snapshot.invalidate_index_checkpoint();
        tracing::info!(
            generation = self.snapshot.generation().get(),
            messages = self.conversation.len(),
            "transcript rewritten externally"
        );
        result
    }

    /// Forget everything but the leading system message.
    pub fn clear(&mut self) {
        let keep = usize::from(
            self.conversation
                .messages()
                .first()
                .is_some_and(|message| message.role() == Role::System),
        );
        self.conversation.truncate(keep);
        self.snapshot.reset();
        self.tracker.reset();
        self.read_streak.reset();
        self.notifications.take();
        self.refresh_system_prompt();
        tracing::info!("session cleared");
    }

    #[must_use]
    pub fn report(&self) -> SessionReport {
        SessionReport {
            snapshot: self.snapshot.stats(),
            summary_line: self.snapshot.summary_line(),
            history_count: self.snapshot.history().len(),
            messages: self.conversation.len(),
            estimated_tokens: self.conversation.estimated_tokens(),
        }
    }
}
