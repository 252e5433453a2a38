//! Service modules for the bulk import flow
//!
//! - Bulk Import Service client (REST, multipart upload)
//! - Background status poller
//! - Import coordinator (state machine + chunk loop)

pub mod bulk_import_client;
pub mod import_coordinator;
pub mod status_poller;

pub use bulk_import_client::{BulkImportService, FileUpload, HttpBulkImportClient, ServiceError};
pub use import_coordinator::ImportCoordinator;
pub use status_poller::StatusPoller;
