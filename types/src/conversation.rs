//! Ordered, single-owner transcript.
//!
//! `Conversation` is the only mutable view of a session's messages. Range
//! replacement hands the removed messages back by value, so nothing can keep
//! aliasing a span after it has been collapsed.

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::{Message, Role};
use crate::text::estimate_tokens;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    #[error("invalid range {start}..{end}")]
    InvertedRange { start: usize, end: usize },
    #[error("range end {end} exceeds conversation length {len}")]
    OutOfBounds { end: usize, len: usize },
}

/// A tool result whose `tool_call_id` has no matching earlier tool call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tool result at index {index} references unknown tool call '{tool_call_id}'")]
pub struct DanglingToolResult {
    pub index: usize,
    pub tool_call_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// The leading system message, if the transcript starts with one.
    pub fn system_mut(&mut self) -> Option<&mut Message> {
        self.messages
            .first_mut()
            .filter(|message| message.role() == Role::System)
    }

    /// Remove and return the messages in `range`.
    pub fn drain(&mut self, range: Range<usize>) -> Result<Vec<Message>, SpliceError> {
        self.check_range(&range)?;
        Ok(self.messages.drain(range).collect())
    }

    /// Replace `range` with a single message, returning the removed messages.
    ///
    /// The conversation shrinks by `range.len() - 1`; an empty range is an
    /// insertion.
    pub fn splice_one(
        &mut self,
        range: Range<usize>,
        replacement: Message,
    ) -> Result<Vec<Message>, SpliceError> {
        self.check_range(&range)?;
        Ok(self.messages.splice(range, [replacement]).collect())
    }

    /// Keep only the first `len` messages.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    /// Sum of the per-message token estimate.
    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        self.messages
            .iter()
            .map(|message| estimate_tokens(message.content()))
            .sum()
    }

    /// Verify that every tool result answers a tool call made earlier in the
    /// transcript.
    pub fn check_tool_call_refs(&self) -> Result<(), DanglingToolResult> {
        let mut issued: HashSet<&str> = HashSet::new();
        for (index, message) in self.messages.iter().enumerate() {
            for call in message.tool_calls() {
                issued.insert(call.id.as_str());
            }
            if let Some(id) = message.tool_call_id()
                && !issued.contains(id)
            {
                return Err(DanglingToolResult {
                    index,
                    tool_call_id: id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), SpliceError> {
        if range.start > range.end {
            return Err(SpliceError::InvertedRange {
                start: range.start,
                end: range.end,
            });
        }
        if range.end > self.messages.len() {
            return Err(SpliceError::OutOfBounds {
                end: range.end,
                len: self.messages.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl FromIterator<Message> for Conversation {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
