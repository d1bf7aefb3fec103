//! Notices the session hands to the host loop for injection into the
//! conversation.
//!
//! Only the session constructs these; the host drains them with
//! [`crate::Session::take_notifications`] before its next model request.

/// A system event the model should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemNotification {
    /// Several read-only tool rounds in a row without collapsing anything.
    SnapshotNudge {
        /// Length of the streak when the nudge fired.
        read_batches: usize,
    },
}

impl SystemNotification {
    /// All notifications are prefixed with `[System: ...]`.
    #[must_use]
    pub fn format(&self) -> String {
        match self {
            Self::SnapshotNudge { read_batches } => format!(
                "[System: {read_batches} read-only tool rounds in a row. If this investigation \
                 is finished, call snapshot with action=\"restore\" and a summary of what you \
                 learned to free context.]"
            ),
        }
    }
}

/// Pending notifications, deduplicated, in arrival order.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: Vec<SystemNotification>,
}

impl NotificationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: SystemNotification) {
        if !self.pending.contains(&notification) {
            self.pending.push(notification);
        }
    }

    pub fn take(&mut self) -> Vec<SystemNotification> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
