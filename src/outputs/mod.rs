//! Rendered output for the CLI.
//!
//! - [`markdown`]: digest and answer documents
//!
//! Documents are always printed; with `--markdown-output-dir` they are
//! also written to disk:
//!
//! ```text
//! markdown_output_dir/
//! ├── technology_digest.md
//! └── technology_answers.md
//! ```

pub mod markdown;

use crate::utils::ensure_writable_dir;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Write `contents` to `{dir}/{file_name}`, creating `dir` if needed.
#[instrument(level = "info", skip(contents), fields(bytes = contents.len()))]
pub async fn write_markdown(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf, Box<dyn Error>> {
    ensure_writable_dir(dir).await?;
    let path = dir.join(file_name);
    fs::write(&path, contents).await?;
    info!(path = %path.display(), "Wrote Markdown");
    Ok(path)
}
