//! Spreadsheet fixtures and coordinator settings for tests

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use welfare_import::config::ImportSettings;

pub const MIB: u64 = 1024 * 1024;

/// Create `dir/name` with exactly `size_bytes` bytes
///
/// Sparse: large sizes cost no disk space.
pub fn spreadsheet(dir: &Path, name: &str, size_bytes: u64) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    file.set_len(size_bytes).unwrap();
    path
}

/// Default limits with no pauses and no status polling
pub fn fast_settings() -> ImportSettings {
    ImportSettings {
        inter_chunk_delay: Duration::ZERO,
        status_poll_interval: Duration::ZERO,
        ..ImportSettings::default()
    }
}
