//! Retained restore summaries and their system-prompt rendering.
//!
//! History lives in engine state, not in the transcript, so it survives the
//! collapses it describes. The rendered block is memoized; only a history
//! mutation marks it stale.

use std::collections::VecDeque;

use serde::Serialize;
use tether_types::truncate_chars;

use crate::limits::SnapshotLimits;

/// Prefix of the rendered history block. Prompt assembly searches for it to
/// strip a stale block before injecting a fresh one.
pub const SNAPSHOT_HISTORY_SENTINEL: &str = "<!-- tether:snapshot-history-5f2c1 -->";

const HISTORY_HEADER: &str = "[Snapshot history: prior investigation summaries]";

/// Whether a restore collapsed an explicitly saved scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Explicit,
    Implicit,
}

impl ScopeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ScopeType::Explicit => "explicit",
            ScopeType::Implicit => "implicit",
        }
    }
}

/// One completed restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub label: String,
    /// Truncated to the display cap at record time.
    pub summary: String,
    pub scope_type: ScopeType,
    pub turns_collapsed: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub tokens_saved: usize,
    pub dirty_at_restore: bool,
    pub forced_restore: bool,
}

/// Bounded FIFO of history entries plus the cached prompt rendering.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: VecDeque<HistoryEntry>,
    limits: SnapshotLimits,
    rendered: Option<String>,
    render_stale: bool,
}

impl SnapshotHistory {
    #[must_use]
    pub fn new(limits: SnapshotLimits) -> Self {
        Self {
            entries: VecDeque::with_capacity(limits.max_history),
            limits,
            rendered: None,
            render_stale: false,
        }
    }

    /// Append an entry, evicting the oldest ones beyond the cap.
    pub fn push(&mut self, mut entry: HistoryEntry) {
        let display = truncate_chars(&entry.summary, self.limits.max_summary_display);
        if display.len() < entry.summary.len() {
            entry.summary = display.to_string();
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.limits.max_history {
            self.entries.pop_front();
        }
        self.render_stale = true;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.rendered = None;
        self.render_stale = false;
    }

    /// The history block for prompt injection, or `None` when there is
    /// nothing to show.
    pub fn render(&mut self) -> Option<&str> {
        if self.render_stale {
            self.rendered = self.build_block();
            self.render_stale = false;
        }
        self.rendered.as_deref()
    }

    /// Entries are included oldest first while their lines fit the budget.
    /// An entry that would overflow it ends the block; entries are never cut
    /// mid-line.
    fn build_block(&self) -> Option<String> {
        let mut block = format!("{SNAPSHOT_HISTORY_SENTINEL}\n{HISTORY_HEADER}");
        let mut used = 0usize;
        let mut included = 0usize;

        for entry in &self.entries {
            let summary = truncate_chars(&entry.summary, self.limits.max_summary_display);
            let line = format!("\n- [{}] {summary}", entry.label);
            let cost = line.chars().count();
            if used + cost > self.limits.history_char_budget {
                break;
            }
            block.push_str(&line);
            used += cost;
            included += 1;
        }

        if included == 0 {
            return None;
        }
        tracing::debug!(entries = included, chars = used, "rendered snapshot history");
        Some(block)
    }
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(SnapshotLimits::default())
    }
}

/// `prompt` with any previously injected history block removed.
#[must_use]
pub fn strip_history_block(prompt: &str) -> &str {
    if prompt.starts_with(SNAPSHOT_HISTORY_SENTINEL) {
        return "";
    }
    let separated = format!("\n\n{SNAPSHOT_HISTORY_SENTINEL}");
    match prompt.find(&separated) {
        Some(index) => &prompt[..index],
        None => prompt,
    }
}

/// Replace any existing history block in `prompt` with `block`.
#[must_use]
pub fn inject_history_block(prompt: &str, block: Option<&str>) -> String {
    let base = strip_history_block(prompt);
    match block {
        Some(block) if base.is_empty() => block.to_string(),
        Some(block) => format!("{base}\n\n{block}"),
        None => base.to_string(),
    }
}
