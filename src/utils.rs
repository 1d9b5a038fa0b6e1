//! Utility functions for naming output files, shortening strings and checking
//! output directories.
//!
//! The naming helpers reproduce the on-disk layout of earlier downloads so
//! new runs sit alongside old ones:
//! - [`sanitize_filename`]: strip `<>:"/\|?*`, spaces to `_`, 100 characters max
//! - [`record_folder_name`]: zero-padded sequence prefix plus sanitized title
//! - [`timestamped_dir_name`]: `documentos_noticias_YYYYmmdd_HHMMSS`

use crate::models::Record;
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static FORBIDDEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("static regex"));

const MAX_FILENAME_CHARS: usize = 100;

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary within `max` bytes,
/// with an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Shorten a title for display: first `max` characters plus `...`.
pub fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

/// Make a title usable as a file or directory name.
///
/// Removes `<>:"/\|?*`, replaces spaces with underscores and keeps at most
/// 100 characters.
pub fn sanitize_filename(name: &str) -> String {
    FORBIDDEN_CHARS
        .replace_all(name, "")
        .replace(' ', "_")
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// Directory name for the record at zero-based `index`.
///
/// `0001_Some_title` when the record has a title, `noticia_0001` otherwise.
pub fn record_folder_name(index: usize, record: &Record) -> String {
    match record.title.as_deref() {
        Some(title) => format!("{:04}_{}", index + 1, sanitize_filename(title)),
        None => format!("noticia_{:04}", index + 1),
    }
}

/// Name of the per-run output directory.
pub fn timestamped_dir_name(now: DateTime<Local>) -> String {
    format!("documentos_noticias_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // std fs for the scratch file: simpler error surface
    let scratch_path = path.join("..__write_check__");
    stdfs::File::create(&scratch_path)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // 'ó' is two bytes; cutting at 2 would split it.
        assert_eq!(truncate_for_log("aóbc", 2), "a…(+4 bytes)");
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("corto", 80), "corto");
        assert_eq!(shorten("ñandú", 3), "ñan...");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename(r#"¿Qué pasa? "Aduanas" <2025>/10\20|*:"#),
            "¿Qué_pasa_Aduanas_20251020"
        );
    }

    #[test]
    fn test_sanitize_filename_truncates_to_100_chars() {
        let long = "é".repeat(150);
        assert_eq!(sanitize_filename(&long).chars().count(), 100);
    }

    #[test]
    fn test_record_folder_name() {
        let titled = Record::from_value(json!({ "titulo": "Nueva ley: comercio exterior" })).unwrap();
        let english = Record::from_value(json!({ "title": "Customs law" })).unwrap();
        let untitled = Record::from_value(json!({ "id": 9 })).unwrap();

        assert_eq!(record_folder_name(0, &titled), "0001_Nueva_ley_comercio_exterior");
        assert_eq!(record_folder_name(41, &english), "0042_Customs_law");
        assert_eq!(record_folder_name(1233, &untitled), "noticia_1234");
    }

    #[test]
    fn test_timestamped_dir_name() {
        let now = Local.with_ymd_and_hms(2025, 10, 22, 9, 5, 3).unwrap();
        assert_eq!(timestamped_dir_name(now), "documentos_noticias_20251022_090503");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__write_check__").exists());
    }
}
