//! Removal of leftover pack/unpack artifacts
//!
//! `unpack` leaves `*_expanded` (or timestamped `*_expanded_*`) directories
//! and `pack` without a destination leaves `*.packed` files in the temp
//! directory. Cleanup of build trees is limited to `<root>/builds`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{PackError, Result};

/// Directory searched recursively when cleaning build outputs
pub const BUILDS_DIR: &str = "builds";

/// What was removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub removed_dirs: Vec<PathBuf>,
    pub removed_files: Vec<PathBuf>,
    /// Locations that were not searched
    pub skipped: Vec<PathBuf>,
}

impl CleanSummary {
    fn extend(&mut self, other: CleanSummary) {
        self.removed_dirs.extend(other.removed_dirs);
        self.removed_files.extend(other.removed_files);
        self.skipped.extend(other.skipped);
    }

    pub fn total(&self) -> usize {
        self.removed_dirs.len() + self.removed_files.len()
    }
}

/// Remove artifacts from the temp directory (`tmp`) and below
/// `<root>/builds` (`out`). Neither flag means both.
pub fn test_clean(tmp: bool, out: bool, root: &Path) -> Result<CleanSummary> {
    let (tmp, out) = if !tmp && !out { (true, true) } else { (tmp, out) };
    let mut summary = CleanSummary::default();

    if tmp {
        summary.extend(clean_artifacts(&std::env::temp_dir(), false)?);
    }
    if out {
        let builds = root.join(BUILDS_DIR);
        if builds.is_dir() {
            summary.extend(clean_artifacts(&builds, true)?);
        } else {
            debug!(path = %builds.display(), "no builds directory, skipping");
            summary.skipped.push(builds);
        }
    }

    info!(removed = summary.total(), "artifact cleanup complete");
    Ok(summary)
}

/// Remove expansion directories and `.packed` files in `dir`
pub fn clean_artifacts(dir: &Path, recursive: bool) -> Result<CleanSummary> {
    let candidates = if recursive {
        let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.display().to_string()));
        glob::glob(&pattern)
            .map_err(|e| PackError::malformed(dir, e))?
            .filter_map(|entry| entry.ok())
            .collect::<Vec<_>>()
    } else {
        fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect()
    };

    let mut summary = CleanSummary::default();
    for path in candidates {
        // may already be gone with a removed parent
        if !path.exists() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if path.is_dir() && is_expansion_dir(name) {
            fs::remove_dir_all(&path).map_err(|e| PackError::unwritable(&path, e))?;
            debug!(path = %path.display(), "removed expansion directory");
            summary.removed_dirs.push(path);
        } else if path.is_file() && name.ends_with(".packed") {
            fs::remove_file(&path).map_err(|e| PackError::unwritable(&path, e))?;
            debug!(path = %path.display(), "removed packed archive");
            summary.removed_files.push(path);
        }
    }
    Ok(summary)
}

fn is_expansion_dir(name: &str) -> bool {
    name.ends_with("_expanded") || name.contains("_expanded_")
}
