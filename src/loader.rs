//! JSON file loading and corpus expansion.
//!
//! Arguments naming directories are expanded depth-first through an explicit
//! worklist. Within a directory, entries are visited in lexicographic order,
//! dot-prefixed entries are skipped, and only subdirectories and names
//! containing `.json` are kept. Directories are tracked by canonical path so
//! symlink cycles are walked once.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::JsonFileError;

/// Load and parse a JSON file.
///
/// # Errors
///
/// Returns `JsonFileError::Io` if the file cannot be read,
/// or `JsonFileError::InvalidJson` if it isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, JsonFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| JsonFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| JsonFileError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse JSON from a string.
pub fn load_json_str(content: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(content)
}

/// A directory that could not be listed.
#[derive(Debug)]
pub struct DirectoryFailure {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Files reachable from a set of arguments.
#[derive(Debug, Default)]
pub struct Expansion {
    /// Candidate files, in visiting order.
    pub files: Vec<PathBuf>,
    /// Directories listed successfully.
    pub directories: usize,
    pub failed_directories: Vec<DirectoryFailure>,
}

/// Whether a directory entry name is a JSON candidate.
pub fn is_json_candidate(name: &str, is_dir: bool) -> bool {
    !name.starts_with('.') && (is_dir || name.contains(".json"))
}

/// Expand file and directory arguments into the list of candidate files.
///
/// Arguments that are not directories are kept as given, even when they do
/// not exist, so the failure surfaces when the file is opened.
pub fn expand_paths<P: AsRef<Path>>(paths: &[P]) -> Expansion {
    let mut expansion = Expansion::default();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut pending: VecDeque<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();

    while let Some(path) = pending.pop_front() {
        if !path.is_dir() {
            expansion.files.push(path);
            continue;
        }

        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if !visited.insert(canonical) {
            tracing::debug!(dir = %path.display(), "directory already visited, skipping");
            continue;
        }

        match list_candidates(&path) {
            Ok(entries) => {
                expansion.directories += 1;
                // Depth-first: children go in front of what was pending.
                for entry in entries.into_iter().rev() {
                    pending.push_front(entry);
                }
            }
            Err(source) => {
                tracing::warn!(dir = %path.display(), error = %source, "unable to open directory");
                expansion.failed_directories.push(DirectoryFailure { path, source });
            }
        }
    }

    expansion
}

fn list_candidates(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if is_json_candidate(name, path.is_dir()) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}
