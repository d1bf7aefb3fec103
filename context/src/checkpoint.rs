//! Checkpoint anchors and scope-boundary resolution.
//!
//! A restore collapses `start..end`. `start` comes from the active explicit
//! checkpoint or from a backward scan for the newest boundary; `end` is the
//! current turn boundary, which must survive the collapse because its tool
//! results are still pending.

use std::fmt;

use tether_types::{Conversation, Role};

/// Transcript epoch.
///
/// Bumped whenever something outside the snapshot engine rewrites the
/// conversation. Compared by equality only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an explicit checkpoint begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The scope starts right after the tool result answering this call.
    ToolCall(String),
    /// The scope starts at `index`, valid only while the transcript is still
    /// at `generation`.
    Index { index: usize, generation: Generation },
    /// Saved without a tool-call id; resolves like the implicit scan.
    Unanchored,
}

impl Anchor {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Anchor::ToolCall(_) => "tool_call",
            Anchor::Index { .. } => "index",
            Anchor::Unanchored => "unanchored",
        }
    }
}

/// The single active explicit checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitCheckpoint {
    label: String,
    anchor: Anchor,
}

impl ExplicitCheckpoint {
    pub(crate) fn new(label: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            label: label.into(),
            anchor,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }
}

/// Index just past the tool result answering `tool_call_id`.
pub(crate) fn start_after_anchor(conversation: &Conversation, tool_call_id: &str) -> Option<usize> {
    conversation
        .iter()
        .position(|message| message.tool_call_id() == Some(tool_call_id))
        .map(|index| index + 1)
}

/// Index just past the newer of the last user message and the last restore
/// boundary.
///
/// The restore boundary matches either the tool result answering the restore
/// call or the recap carrying its marker. A boundary that has vanished from
/// the transcript (external compaction) falls back to the last user message.
pub(crate) fn implicit_start(
    conversation: &Conversation,
    last_restore_id: Option<&str>,
) -> Option<usize> {
    let messages = conversation.messages();
    let last_user = messages
        .iter()
        .rposition(|message| message.role() == Role::User);
    let last_restore = last_restore_id.and_then(|id| {
        messages.iter().rposition(|message| {
            message.tool_call_id() == Some(id) || message.restore_marker() == Some(id)
        })
    });

    if let Some(id) = last_restore_id
        && last_restore.is_none()
    {
        tracing::warn!(
            restore_id = id,
            "restore boundary no longer in transcript; using last user message"
        );
    }

    last_user.max(last_restore).map(|boundary| boundary + 1)
}

/// The current turn boundary: the newest assistant message still waiting on
/// tool results, searched no further back than `start`. Without one the
/// scope runs to the end of the transcript.
pub(crate) fn turn_end(conversation: &Conversation, start: usize) -> usize {
    let len = conversation.len();
    let messages = conversation.messages();
    (start.min(len)..len)
        .rev()
        .find(|&index| messages[index].requests_tools())
        .unwrap_or(len)
}
