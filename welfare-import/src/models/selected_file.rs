//! Selected spreadsheet and its pre-flight checks
//!
//! Both checks run before any network call. The extension check happens on
//! pick; the size check happens when initialization is requested.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions the Bulk Import Service can parse
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// A file that passed the extension check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

impl SelectedFile {
    /// Stat `path` and check its extension
    ///
    /// Returns `Ok(None)` when the extension is not accepted.
    pub async fn inspect(path: &Path) -> std::io::Result<Option<Self>> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !has_accepted_extension(&file_name) {
            return Ok(None);
        }

        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a regular file: {}", path.display()),
            ));
        }

        Ok(Some(Self {
            path: path.to_path_buf(),
            file_name,
            size_bytes: metadata.len(),
        }))
    }

    /// True when the file fits under `limit_bytes` (inclusive)
    pub fn within_size_limit(&self, limit_bytes: u64) -> bool {
        self.size_bytes <= limit_bytes
    }

    /// MIME type sent with the multipart upload
    pub fn mime_type(&self) -> &'static str {
        if extension_of(&self.file_name).as_deref() == Some("xls") {
            "application/vnd.ms-excel"
        } else {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
    }
}

/// Case-insensitive check against [`ACCEPTED_EXTENSIONS`]
pub fn has_accepted_extension(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
