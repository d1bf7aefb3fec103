//! Read-streak tracking for the snapshot nudge.

use crate::notifications::SystemNotification;

/// Counts consecutive tool batches made only of read-only tools.
///
/// Fires once per streak; a mutating batch (or a restore) starts a new one.
#[derive(Debug, Clone)]
pub(crate) struct ReadStreak {
    threshold: usize,
    streak: usize,
    fired: bool,
}

impl ReadStreak {
    pub(crate) fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            streak: 0,
            fired: false,
        }
    }

    pub(crate) fn record_batch(&mut self, read_only: bool) -> Option<SystemNotification> {
        if !read_only {
            self.reset();
            return None;
        }
        self.streak += 1;
        if self.streak < self.threshold || self.fired {
            return None;
        }
        self.fired = true;
        tracing::debug!(read_batches = self.streak, "snapshot nudge fired");
        Some(SystemNotification::SnapshotNudge {
            read_batches: self.streak,
        })
    }

    pub(crate) fn reset(&mut self) {
        self.streak = 0;
        self.fired = false;
    }

    pub(crate) fn streak(&self) -> usize {
        self.streak
    }
}
