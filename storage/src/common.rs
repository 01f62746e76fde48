//! Shared helpers for mapping low-level I/O failures onto [`DexError`].

use std::io;
use std::path::Path;

use dex_core::error::DexError;

/// Maps a filesystem error encountered while reading or writing `path` to a
/// storage-layer [`DexError`]. Missing files are the caller's responsibility
/// to detect up front; this always produces `StorageIO`.
pub fn io_error(path: &Path, err: io::Error) -> DexError {
    DexError::StorageIO(format!("{}: {err}", path.display()))
}

/// Maps a JSON decode failure for a specific line of a JSONL file to
/// `DataCorruption`, carrying the file path and 1-based line number so the
/// operator can locate and hand-fix the offending record.
pub fn corruption(path: &Path, line: usize, err: serde_json::Error) -> DexError {
    DexError::DataCorruption {
        file: path.display().to_string(),
        line,
        reason: err.to_string(),
    }
}

/// Ensures `dir` exists, creating it (and any missing ancestors) if not.
pub fn ensure_dir(dir: &Path) -> Result<(), DexError> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))
}
