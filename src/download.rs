use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::errors::{AppError, ResultExt};

/// Binary payload returned by an export endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    /// File name announced in `Content-Disposition`, if any.
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// An export written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedExport {
    pub path: PathBuf,
    pub size: usize,
    /// SHA-256 of the bytes written (hex encoded)
    pub sha256: String,
    pub saved_at: DateTime<Utc>,
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"filename="(.+)""#).expect("content-disposition pattern is valid")
    })
}

/// Extracts `filename="..."` from a `Content-Disposition` header value.
///
/// Only the quoted form is recognised; anything else falls back to the
/// caller's default name.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    filename_pattern()
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Reduces a server-supplied name to its last path component.
///
/// Returns `None` when nothing usable is left (`..`, empty, only separators).
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last.to_string())
    }
}

/// Hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Writes `download` into `dir`, named after the header or `default_name`.
pub async fn save_download(
    dir: &Path,
    download: &Download,
    default_name: &str,
) -> Result<SavedExport, AppError> {
    let name = download
        .filename
        .as_deref()
        .and_then(sanitize_filename)
        .or_else(|| sanitize_filename(default_name))
        .ok_or_else(|| AppError::Io(format!("No usable file name for export: {}", default_name)))?;

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create download directory {}", dir.display()))?;

    let path = dir.join(&name);
    tokio::fs::write(&path, &download.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let saved = SavedExport {
        size: download.bytes.len(),
        sha256: sha256_hex(&download.bytes),
        saved_at: Utc::now(),
        path,
    };
    tracing::info!(
        "✓ Export saved to {} ({} bytes, sha256 {})",
        saved.path.display(),
        saved.size,
        saved.sha256
    );
    Ok(saved)
}
