//! Snapshot failures.
//!
//! The `Display` text of every variant is read by the model itself, so each
//! message names what went wrong and what to call next. Keep the wording
//! stable.

use tether_types::SpliceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("save requires a non-empty 'label' parameter")]
    EmptyLabel,
    #[error("label exceeds {max} character limit")]
    LabelTooLong { max: usize },
    #[error("explicit checkpoint already active (label='{active}'). Call cancel first.")]
    AlreadyActive { active: String },
    #[error("restore requires a non-empty 'summary' parameter")]
    EmptySummary,
    #[error("summary exceeds {max} character limit")]
    SummaryTooLong { max: usize },
    #[error(
        "scope is dirty ({}). Call `snapshot restore force=true` to override, or `snapshot cancel` to keep context.",
        .tools.join(", ")
    )]
    Dirty { tools: Vec<String> },
    #[error(
        "explicit checkpoint marker was removed (likely by compaction). Call `snapshot cancel` and try again."
    )]
    MarkerRemoved,
    #[error(
        "checkpoint '{label}' was invalidated because the conversation was rewritten after it was saved. Cancel it and save a new checkpoint."
    )]
    StaleCheckpoint { label: String },
    #[error(
        "checkpoint '{label}' at index {index} is out of range (conversation has {len} messages). Cancel it and save a new checkpoint."
    )]
    CheckpointOutOfRange {
        label: String,
        index: usize,
        len: usize,
    },
    #[error("no implicit checkpoint found (no user message in history)")]
    NoImplicitCheckpoint,
    #[error("collapse failed: {0}")]
    Splice(#[from] SpliceError),
}
