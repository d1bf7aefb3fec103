//! The snapshot state machine.
//!
//! # Lifecycle
//!
//! ```text
//! idle ──save──▶ checkpoint active ──restore──▶ idle (scope collapsed)
//!                      │
//!                      └──cancel──▶ idle (context kept)
//! ```
//!
//! A restore without an active checkpoint collapses the implicit scope: from
//! just after the newest user message or previous restore, up to the current
//! turn boundary. Any non-read-only tool used since the last boundary makes
//! the scope dirty, and a dirty scope is only collapsed when forced.
//!
//! Every collapse replaces a contiguous span with one recap message that
//! carries no tool calls, and the span never reaches past the assistant
//! message whose tool results are still pending. Tool results therefore
//! always keep their originating call.

use serde::Serialize;
use tether_types::{Conversation, Message, estimate_tokens, truncate_chars};

use crate::checkpoint::{self, Anchor, ExplicitCheckpoint, Generation};
use crate::dirty::DirtySet;
use crate::error::SnapshotError;
use crate::history::{HistoryEntry, ScopeType, SnapshotHistory};
use crate::limits::{MAX_LABEL_CHARS, MAX_SUMMARY_CHARS, SnapshotLimits};

/// Label used when a restore collapses a scope nobody named.
pub const DEFAULT_LABEL: &str = "investigation";

/// Summary used when an interactive restore gets nothing from its summarizer.
pub const FALLBACK_SUMMARY: &str = "(context collapsed by user)";

// ============================================================================
// Requests and outcomes
// ============================================================================

/// Parameters of a restore.
#[derive(Debug, Clone, Copy)]
pub struct RestoreRequest<'a> {
    summary: &'a str,
    force: bool,
    tool_call_id: Option<&'a str>,
    end_index: Option<usize>,
}

impl<'a> RestoreRequest<'a> {
    #[must_use]
    pub fn new(summary: &'a str) -> Self {
        Self {
            summary,
            force: false,
            tool_call_id: None,
            end_index: None,
        }
    }

    /// Collapse even when the scope is dirty.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Id of the tool call performing this restore. The recap is tagged with
    /// it so later implicit restores start after it.
    #[must_use]
    pub fn tool_call_id(mut self, tool_call_id: Option<&'a str>) -> Self {
        self.tool_call_id = tool_call_id;
        self
    }

    /// Collapse up to `end_index` instead of the current turn boundary.
    #[must_use]
    pub fn end_index(mut self, end_index: usize) -> Self {
        self.end_index = Some(end_index);
        self
    }
}

/// What a successful collapse did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollapseReport {
    pub label: String,
    pub scope_type: ScopeType,
    pub start: usize,
    pub turns_collapsed: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub tokens_saved: usize,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Collapsed(CollapseReport),
    /// The resolved scope held no messages. Nothing was changed.
    EmptyScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cleared { label: String },
    NoCheckpoint,
}

/// Aggregate counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub saves: u64,
    pub restores: u64,
    pub cancels: u64,
    pub blocked: u64,
    pub force_restores: u64,
    pub tokens_saved: u64,
}

/// Read-only view of the engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotStatus {
    pub explicit_active: bool,
    pub explicit_label: Option<String>,
    pub anchor: Option<&'static str>,
    pub dirty: bool,
    pub dirty_tools: Vec<String>,
    pub history_count: usize,
    pub generation: u64,
    pub stats: SnapshotStats,
}

// ============================================================================
// SnapshotEngine
// ============================================================================

/// Checkpoint, collapse, and history state for one session.
#[derive(Debug, Clone)]
pub struct SnapshotEngine {
    limits: SnapshotLimits,
    explicit: Option<ExplicitCheckpoint>,
    last_restore_id: Option<String>,
    dirty: DirtySet,
    history: SnapshotHistory,
    stats: SnapshotStats,
    generation: Generation,
    interactive_restores: u64,
}

impl Default for SnapshotEngine {
    fn default() -> Self {
        Self::new(SnapshotLimits::default())
    }
}

impl SnapshotEngine {
    #[must_use]
    pub fn new(limits: SnapshotLimits) -> Self {
        Self {
            limits,
            explicit: None,
            last_restore_id: None,
            dirty: DirtySet::default(),
            history: SnapshotHistory::new(limits),
            stats: SnapshotStats::default(),
            generation: Generation::default(),
            interactive_restores: 0,
        }
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    /// Activate an explicit checkpoint anchored after the result of
    /// `anchor_tool_call_id`. Without an id the checkpoint resolves like the
    /// implicit scan.
    pub fn save(&mut self, label: &str, anchor_tool_call_id: Option<&str>) -> Result<(), SnapshotError> {
        let anchor = match anchor_tool_call_id {
            Some(id) => Anchor::ToolCall(id.to_string()),
            None => Anchor::Unanchored,
        };
        self.activate(label, anchor)
    }

    /// Activate an explicit checkpoint at a message index, valid for the
    /// current generation only.
    pub fn save_at_index(&mut self, label: &str, index: usize) -> Result<(), SnapshotError> {
        let generation = self.generation;
        self.activate(label, Anchor::Index { index, generation })
    }

    fn activate(&mut self, label: &str, anchor: Anchor) -> Result<(), SnapshotError> {
        validate_label(label)?;
        if let Some(active) = &self.explicit {
            return Err(SnapshotError::AlreadyActive {
                active: active.label().to_string(),
            });
        }

        tracing::info!(label, anchor = anchor.kind(), "snapshot checkpoint saved");
        self.explicit = Some(ExplicitCheckpoint::new(label, anchor));
        self.dirty.clear();
        self.stats.saves += 1;
        Ok(())
    }

    /// Clear the active explicit checkpoint, keeping all context.
    pub fn cancel(&mut self) -> CancelOutcome {
        match self.explicit.take() {
            Some(checkpoint) => {
                self.stats.cancels += 1;
                tracing::info!(label = checkpoint.label(), "snapshot checkpoint cancelled");
                CancelOutcome::Cleared {
                    label: checkpoint.label().to_string(),
                }
            }
            None => CancelOutcome::NoCheckpoint,
        }
    }

    // ------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------

    /// Collapse the current scope of `conversation` into one recap message.
    ///
    /// Validation and dirty-gating failures leave both the conversation and
    /// the engine untouched (apart from the blocked counter).
    pub fn restore(
        &mut self,
        conversation: &mut Conversation,
        request: RestoreRequest<'_>,
    ) -> Result<RestoreOutcome, SnapshotError> {
        validate_summary(request.summary)?;

        if self.dirty.is_dirty() && !request.force {
            self.stats.blocked += 1;
            let tools = self.dirty.to_vec();
            tracing::warn!(dirty_tools = ?tools, "snapshot restore blocked by dirty scope");
            return Err(SnapshotError::Dirty { tools });
        }

        let start = self.resolve_start(conversation)?;
        let end = match request.end_index {
            Some(end) => end.min(conversation.len()),
            None => checkpoint::turn_end(conversation, start),
        };
        if end <= start {
            tracing::debug!(start, end, "snapshot restore found an empty scope");
            return Ok(RestoreOutcome::EmptyScope);
        }

        let marker = request.tool_call_id.map(ToOwned::to_owned);
        self.collapse(conversation, start..end, request.summary, marker)
            .map(RestoreOutcome::Collapsed)
    }

    /// User-issued restore: collapses from the resolved start to the end of
    /// the transcript, summarizing the scope with `summarize`.
    ///
    /// The user authorized it, so a dirty scope does not block it; the
    /// collapse is recorded as forced instead.
    pub fn restore_with_summarizer<F>(
        &mut self,
        conversation: &mut Conversation,
        summarize: F,
    ) -> Result<RestoreOutcome, SnapshotError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let start = self.resolve_start(conversation)?;
        let end = conversation.len();
        if end <= start {
            return Ok(RestoreOutcome::EmptyScope);
        }

        let scope_text = render_scope(&conversation.messages()[start..end]);
        let summary = summarize(&scope_text)
            .map(|summary| summary.trim().to_string())
            .filter(|summary| !summary.is_empty())
            .map_or_else(
                || FALLBACK_SUMMARY.to_string(),
                |summary| truncate_chars(&summary, MAX_SUMMARY_CHARS).to_string(),
            );

        self.interactive_restores += 1;
        let marker = format!("interactive-restore-{}", self.interactive_restores);
        self.collapse(conversation, start..end, &summary, Some(marker))
            .map(RestoreOutcome::Collapsed)
    }

    fn collapse(
        &mut self,
        conversation: &mut Conversation,
        scope: std::ops::Range<usize>,
        summary: &str,
        marker: Option<String>,
    ) -> Result<CollapseReport, SnapshotError> {
        let start = scope.start;
        let turns_collapsed = scope.len();
        let tokens_before: usize = conversation.messages()[scope.clone()]
            .iter()
            .map(|message| estimate_tokens(message.content()))
            .sum();
        let tokens_after = estimate_tokens(summary);
        let tokens_saved = tokens_before.saturating_sub(tokens_after);

        let scope_type = if self.explicit.is_some() {
            ScopeType::Explicit
        } else {
            ScopeType::Implicit
        };
        let label = self
            .explicit
            .as_ref()
            .map_or(DEFAULT_LABEL, ExplicitCheckpoint::label)
            .to_string();
        let dirty = self.dirty.is_dirty();

        let recap = Message::recap(
            format!(
                "[snapshot: {label}]\n{summary}\n(collapsed {turns_collapsed} turns, saved ~{tokens_saved} tokens)"
            ),
            marker.clone(),
        );
        // Removed messages are dropped here; nothing else holds them.
        let _removed = conversation.splice_one(scope, recap)?;

        self.history.push(HistoryEntry {
            label: label.clone(),
            summary: summary.to_string(),
            scope_type,
            turns_collapsed,
            tokens_before,
            tokens_after,
            tokens_saved,
            dirty_at_restore: dirty,
            forced_restore: dirty,
        });

        self.stats.restores += 1;
        self.stats.tokens_saved += tokens_saved as u64;
        if dirty {
            self.stats.force_restores += 1;
        }
        self.explicit = None;
        self.last_restore_id = marker;
        self.dirty.clear();

        tracing::info!(
            label = %label,
            scope = scope_type.as_str(),
            turns_collapsed,
            tokens_saved,
            forced = dirty,
            "snapshot restored"
        );

        Ok(CollapseReport {
            label,
            scope_type,
            start,
            turns_collapsed,
            tokens_before,
            tokens_after,
            tokens_saved,
            forced: dirty,
        })
    }

    /// First index of the scope a restore would collapse.
    pub fn resolve_start(&self, conversation: &Conversation) -> Result<usize, SnapshotError> {
        let Some(explicit) = &self.explicit else {
            return self.implicit_start(conversation);
        };

        match explicit.anchor() {
            Anchor::ToolCall(id) => checkpoint::start_after_anchor(conversation, id).ok_or_else(|| {
                tracing::warn!(
                    label = explicit.label(),
                    anchor = %id,
                    "explicit checkpoint marker missing from transcript"
                );
                SnapshotError::MarkerRemoved
            }),
            Anchor::Index { index, generation } => {
                if *generation != self.generation {
                    tracing::warn!(
                        label = explicit.label(),
                        saved_generation = %generation,
                        generation = %self.generation,
                        "index checkpoint is stale"
                    );
                    return Err(SnapshotError::StaleCheckpoint {
                        label: explicit.label().to_string(),
                    });
                }
                if *index > conversation.len() {
                    return Err(SnapshotError::CheckpointOutOfRange {
                        label: explicit.label().to_string(),
                        index: *index,
                        len: conversation.len(),
                    });
                }
                Ok(*index)
            }
            Anchor::Unanchored => self.implicit_start(conversation),
        }
    }

    fn implicit_start(&self, conversation: &Conversation) -> Result<usize, SnapshotError> {
        checkpoint::implicit_start(conversation, self.last_restore_id.as_deref())
            .ok_or(SnapshotError::NoImplicitCheckpoint)
    }

    // ------------------------------------------------------------------
    // Dirty tracking
    // ------------------------------------------------------------------

    /// Record a tool invocation. Returns `true` if it dirtied the scope.
    pub fn mark_mutating(&mut self, tool_name: &str) -> bool {
        let mutating = self.dirty.mark(tool_name);
        if mutating {
            tracing::debug!(tool = tool_name, "scope marked dirty");
        }
        mutating
    }

    /// Clear the dirty set at a checkpoint boundary or a fresh user turn.
    pub fn reset_dirty(&mut self) {
        self.dirty.clear();
    }

    // ------------------------------------------------------------------
    // History, staleness, reset
    // ------------------------------------------------------------------

    /// Retained summaries rendered for the system prompt.
    pub fn render_history(&mut self) -> Option<&str> {
        self.history.render()
    }

    /// Record that the transcript was rewritten outside this engine.
    pub fn invalidate_index_checkpoint(&mut self) {
        self.generation = self.generation.next();
        tracing::debug!(generation = %self.generation, "transcript generation advanced");
    }

    /// Drop all state for a session-level clear.
    pub fn reset(&mut self) {
        *self = Self::new(self.limits);
        tracing::info!("snapshot state reset");
    }

    #[must_use]
    pub fn status(&self) -> SnapshotStatus {
        SnapshotStatus {
            explicit_active: self.explicit.is_some(),
            explicit_label: self.explicit.as_ref().map(|cp| cp.label().to_string()),
            anchor: self.explicit.as_ref().map(|cp| cp.anchor().kind()),
            dirty: self.dirty.is_dirty(),
            dirty_tools: self.dirty.to_vec(),
            history_count: self.history.len(),
            generation: self.generation.get(),
            stats: self.stats,
        }
    }

    /// One-line report, present once anything was saved or restored.
    #[must_use]
    pub fn summary_line(&self) -> Option<String> {
        if self.stats.saves + self.stats.restores == 0 {
            return None;
        }
        Some(format!(
            "snapshot: {} restore(s), ~{} tokens saved",
            self.stats.restores, self.stats.tokens_saved
        ))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn explicit_checkpoint(&self) -> Option<&ExplicitCheckpoint> {
        self.explicit.as_ref()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    #[must_use]
    pub fn dirty_tools(&self) -> Vec<String> {
        self.dirty.to_vec()
    }

    #[must_use]
    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    #[must_use]
    pub fn stats(&self) -> SnapshotStats {
        self.stats
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn limits(&self) -> SnapshotLimits {
        self.limits
    }
}

fn validate_label(label: &str) -> Result<(), SnapshotError> {
    if label.trim().is_empty() {
        return Err(SnapshotError::EmptyLabel);
    }
    if label.chars().count() > MAX_LABEL_CHARS {
        return Err(SnapshotError::LabelTooLong {
            max: MAX_LABEL_CHARS,
        });
    }
    Ok(())
}

fn validate_summary(summary: &str) -> Result<(), SnapshotError> {
    if summary.trim().is_empty() {
        return Err(SnapshotError::EmptySummary);
    }
    if summary.chars().count() > MAX_SUMMARY_CHARS {
        return Err(SnapshotError::SummaryTooLong {
            max: MAX_SUMMARY_CHARS,
        });
    }
    Ok(())
}

/// Plain-text rendering of a scope for a summarizer.
fn render_scope(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(message.role().as_str());
        out.push_str(": ");
        out.push_str(message.content());
        for call in message.tool_calls() {
            out.push_str(&format!("\n[tool call {}: {}]", call.name, call.arguments));
        }
    }
    out
}
