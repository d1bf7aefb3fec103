//! Proactive context collapse for agent conversations
//!
//! This crate provides:
//! - Explicit checkpoints anchored to a tool call or a message index
//! - Implicit scope resolution (last user message or last restore)
//! - Dirty tracking against a read-only tool allowlist
//! - Restore: one recap message replaces the collapsed span
//! - Bounded history of past restores, rendered for the system prompt
//!
//! # Architecture
//!
//! ```text
//! SnapshotEngine (one per session)
//! ├── explicit: Option<ExplicitCheckpoint> (ToolCall | Index+Generation | Unanchored)
//! ├── dirty: DirtySet (mutating tool names since last boundary)
//! ├── history: SnapshotHistory (FIFO + cached rendering)
//! └── generation: Generation (bumped on external rewrites)
//! ```

mod checkpoint;
mod dirty;
mod error;
mod history;
mod limits;
mod snapshot;

pub use checkpoint::{Anchor, ExplicitCheckpoint, Generation};
pub use dirty::{DirtySet, READ_ONLY_TOOLS, is_read_only};
pub use error::SnapshotError;
pub use history::{
    HistoryEntry, SNAPSHOT_HISTORY_SENTINEL, ScopeType, SnapshotHistory, inject_history_block,
    strip_history_block,
};
pub use limits::{
    DEFAULT_HISTORY_CHAR_BUDGET, DEFAULT_MAX_HISTORY, DEFAULT_MAX_SUMMARY_DISPLAY,
    MAX_LABEL_CHARS, MAX_SUMMARY_CHARS, SnapshotLimits,
};
pub use snapshot::{
    CancelOutcome, CollapseReport, DEFAULT_LABEL, FALLBACK_SUMMARY, RestoreOutcome,
    RestoreRequest, SnapshotEngine, SnapshotStats, SnapshotStatus,
};
