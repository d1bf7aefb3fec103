//! Session composition for Tether.
//!
//! A [`Session`] owns one conversation together with the snapshot engine,
//! file access tracker and tool registry that guard it, and exposes the
//! hooks a host agent loop calls each turn:
//!
//! - [`Session::on_loop_entry`] before every model request
//! - [`Session::run_pending_tool_calls`] after the model asks for tools
//! - [`Session::take_notifications`] to pick up nudges for injection
//!
//! User commands (`save`, `restore`, `clear`) and external compaction go
//! through the session as well, so the engines always see every mutation.

mod notifications;
mod nudge;
mod session;

pub use notifications::{NotificationQueue, SystemNotification};
pub use session::{Session, SessionReport};
