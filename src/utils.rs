//! String helpers for logging and Markdown, and output directory checks.

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` characters are cut and suffixed with
/// `"…(+N bytes)"` counting the dropped bytes.
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

/// Convert a title to a Markdown anchor.
///
/// Lowercases, drops everything but alphanumerics, spaces and hyphens,
/// then replaces spaces with hyphens.
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Test-Article!"), "test-article");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// File-name form of a topic.
///
/// # Arguments
///
/// * `topic` - Topic as typed by the user
///
/// # Returns
///
/// The trimmed, lowercased topic with whitespace turned into underscores
/// and everything but alphanumerics, `-` and `_` removed, so the slug can
/// never name a path outside the directory it is joined to. A topic with
/// nothing left becomes `"topic"`.
///
/// ```ignore
/// assert_eq!(topic_slug(" Climate Change "), "climate_change");
/// assert_eq!(topic_slug("../../x"), "x");
/// ```
pub fn topic_slug(topic: &str) -> String {
    let slug: String = topic
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect();
    if slug.is_empty() { "topic".to_string() } else { slug }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if missing, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
