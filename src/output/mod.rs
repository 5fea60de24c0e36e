//! Output artifact writers
//!
//! Every artifact is written atomically: bytes go to a temporary file in
//! the destination directory, which is fsynced and then renamed into place.
//! A reader (or a done-marker check after a crash) therefore never sees a
//! truncated file.

use std::io::Write;
use std::path::Path;
use tracing::debug;

pub mod csv;
pub mod path;

pub use self::csv::render_csv;
pub use path::{split_into_month_ranges, ExportPaths};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Rows of one sectioned CSV export
///
/// The exported files start with a single-cell section row followed by the
/// column header, then one record per row.
pub trait CsvRows {
    /// Section name written on the first line (e.g. `Body`)
    const SECTION: &'static str;

    /// Column names written on the second line
    const HEADER: &'static [&'static str];

    /// Field values for this row, in [`HEADER`](Self::HEADER) order
    fn record(&self) -> Vec<String>;
}

/// Atomically replace `path` with `bytes`
///
/// The parent directory must exist.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;

    // Best effort: make the rename itself durable
    if let Ok(dir) = std::fs::File::open(parent_dir) {
        let _ = dir.sync_all();
    }

    debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
    Ok(())
}

/// [`write_atomic`] with the error mapped into [`OutputError`]
pub fn write_artifact(path: &Path, bytes: &[u8]) -> OutputResult<()> {
    write_atomic(path, bytes)
        .map_err(|e| OutputError::IoError(format!("Failed to write {}: {e}", path.display())))
}
