//! Store directory resolution (spec §4.3).
//!
//! "In-repo" mode nests the store under the nearest ancestor directory that
//! contains a `.git` entry (file or directory — worktrees and submodules
//! use a `.git` *file*). "Centralized" mode instead names a subdirectory of
//! a central home by a deterministic key derived from that same ancestor
//! (or the current directory, if no `.git` ancestor exists).

use std::path::{Path, PathBuf};

use dex_core::config::StoreMode;

/// Walks upward from `start` looking for the nearest ancestor containing a
/// `.git` entry. Returns `None` if none is found before the filesystem root.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// A filesystem-safe, deterministic key for a project root: its canonical
/// path with separators collapsed to `-`.
pub fn project_key(root: &Path) -> String {
    let canonical = root
        .canonicalize()
        .unwrap_or_else(|_| root.to_path_buf());
    let raw = canonical.to_string_lossy().replace(['/', '\\'], "-");
    raw.trim_start_matches('-').to_string()
}

/// Resolves the store directory for `mode`, given the directory sync is
/// being invoked from (`start`, usually the current working directory) and
/// the central home directory (usually `~/.dex`) used both as the
/// centralized-mode root and the in-repo fallback when no `.git` ancestor
/// exists.
pub fn resolve_store_dir(mode: StoreMode, start: &Path, central_home: &Path) -> PathBuf {
    let git_root = find_git_root(start);
    match mode {
        StoreMode::InRepo => match &git_root {
            Some(root) => root.join(".dex"),
            None => central_home.join(project_key(start)),
        },
        StoreMode::Centralized => {
            let key_root = git_root.as_deref().unwrap_or(start);
            central_home.join(project_key(key_root))
        }
    }
}
