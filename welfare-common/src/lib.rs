//! # Welfare Common Library
//!
//! Shared code for the welfare case-management tooling:
//! - Error type
//! - TOML configuration loading and atomic write-back
//! - Event types (WelfareEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
