//! Size limits for snapshot labels, summaries, and retained history.

/// Maximum label length in characters. Part of the model-facing contract.
pub const MAX_LABEL_CHARS: usize = 100;

/// Maximum summary length in characters. Part of the model-facing contract.
pub const MAX_SUMMARY_CHARS: usize = 4000;

pub const DEFAULT_MAX_HISTORY: usize = 10;
pub const DEFAULT_MAX_SUMMARY_DISPLAY: usize = 1200;
/// Roughly 1500 tokens of system prompt.
pub const DEFAULT_HISTORY_CHAR_BUDGET: usize = 6000;

/// Tunable caps on retained snapshot history.
///
/// Whatever values are configured, they are enforced as hard limits: the
/// history never holds more than `max_history` entries and the rendered block
/// never includes a partial entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotLimits {
    /// History entries retained (oldest evicted first).
    pub max_history: usize,
    /// Characters of each summary kept in history and shown in the prompt.
    pub max_summary_display: usize,
    /// Characters of entry lines allowed in the rendered history block.
    pub history_char_budget: usize,
}

impl Default for SnapshotLimits {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            max_summary_display: DEFAULT_MAX_SUMMARY_DISPLAY,
            history_char_budget: DEFAULT_HISTORY_CHAR_BUDGET,
        }
    }
}
