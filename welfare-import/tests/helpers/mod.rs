//! Test Helper Utilities
//!
//! Shared utilities for testing welfare-import

#![allow(dead_code)]

pub mod fixtures;
pub mod mock_server;
pub mod scripted_service;

pub use fixtures::{fast_settings, spreadsheet, MIB};
pub use mock_server::MockServer;
pub use scripted_service::{ChunkBehavior, ScriptedService};
