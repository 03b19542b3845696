//! Utility functions for logging, file naming, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for log lines carrying message text
//! - Filename sanitisation for portal-provided values
//! - Write checks for the photo archive directory

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters and get an ellipsis plus a
/// byte count of what was dropped.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Make a portal-provided value safe to use inside a file name.
///
/// Anything other than ASCII letters, digits, `-` and `_` becomes `-`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(file_safe("2021-05-21"), "2021-05-21");
/// assert_eq!(file_safe("21/05/2021"), "21-05-2021");
/// ```
pub fn file_safe(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns the I/O error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe = path.join("..__probe_write__");
    fs::write(&probe, b"").await?;
    let _ = fs::remove_file(&probe).await;
    info!("Photo directory is writable");
    Ok(())
}
