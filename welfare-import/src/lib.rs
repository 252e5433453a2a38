//! welfare-import library interface
//!
//! Client-side coordinator for chunked bulk imports of welfare beneficiary
//! spreadsheets. Exposes public APIs for the CLI and integration testing.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod render;
pub mod services;

pub use crate::error::{CoordinatorResult, ImportError};
pub use crate::models::{ImportProgress, ImportResult, ImportSession, SelectedFile};
pub use crate::services::{
    BulkImportService, HttpBulkImportClient, ImportCoordinator, ServiceError,
};
