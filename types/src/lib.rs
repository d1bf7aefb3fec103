//! Core domain types for Tether.
//!
//! This crate contains pure conversation types with no IO, no async, and
//! minimal dependencies. Everything here can be used from any layer.
//!
//! The transcript invariant every layer relies on: each `tool`-role message
//! answers a tool call issued by an earlier `assistant` message
//! ([`Conversation::check_tool_call_refs`]).

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod conversation;
mod message;
mod text;

pub use conversation::{Conversation, DanglingToolResult, SpliceError};
pub use message::{Message, MessageError, Role, ToolCall};
pub use text::{estimate_tokens, truncate_chars};
