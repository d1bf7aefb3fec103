//! Integration test modules

mod config;
mod file_access;
mod nudge;
mod snapshot_flow;
