//! Pack and unpack transforms between ZIP archives and directories
//!
//! Both directions are all-or-nothing: the destination is either fully
//! written or left untouched. `unpack` never deletes or writes into an
//! existing directory; it picks a fresh, timestamp-suffixed name instead.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{PackError, Result};
use crate::naming::{fallback_pack_path, timestamp, NamingPolicy};
use crate::package::Package;

/// Result of an unpack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackOutcome {
    /// Directory the entries were written to
    pub dest: PathBuf,
    /// Number of entries written
    pub entries: usize,
}

/// Result of a pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOutcome {
    /// Archive that was written
    pub archive: PathBuf,
    /// Number of entries packed
    pub entries: usize,
}

/// Expand `archive` into a directory.
///
/// Without `dest`, the directory is `<archive stem>_expanded` beside the
/// archive. If the chosen directory already exists a UTC timestamp is
/// appended to its name.
pub fn unpack(archive: &Path, dest: Option<&Path>) -> Result<UnpackOutcome> {
    unpack_at(archive, dest, Utc::now())
}

/// [`unpack`] with an explicit clock
pub fn unpack_at(archive: &Path, dest: Option<&Path>, now: DateTime<Utc>) -> Result<UnpackOutcome> {
    if !archive.is_file() {
        return Err(PackError::SourceNotFound(archive.to_path_buf()));
    }

    let package = Package::open_archive(archive)?;

    let requested = match dest {
        Some(d) => d.to_path_buf(),
        None => default_unpack_dir(archive),
    };
    let dest = collision_free_dir(&requested, now);
    if dest != requested {
        warn!(
            requested = %requested.display(),
            chosen = %dest.display(),
            "destination exists, unpacking beside it"
        );
    }

    package.write_to_directory(&dest)?;
    info!(archive = %archive.display(), dest = %dest.display(), entries = package.len(), "unpacked");

    Ok(UnpackOutcome {
        dest,
        entries: package.len(),
    })
}

/// Compress `source_dir` into a ZIP archive.
///
/// Without `archive`, the destination comes from `policy`, falling back to a
/// timestamped `.packed` file in the temp directory. An existing archive at
/// the destination is replaced, never merged into.
pub fn pack(
    source_dir: &Path,
    archive: Option<&Path>,
    policy: &dyn NamingPolicy,
) -> Result<PackOutcome> {
    pack_at(source_dir, archive, policy, Utc::now())
}

/// [`pack`] with an explicit clock
pub fn pack_at(
    source_dir: &Path,
    archive: Option<&Path>,
    policy: &dyn NamingPolicy,
    now: DateTime<Utc>,
) -> Result<PackOutcome> {
    if !source_dir.is_dir() {
        return Err(PackError::SourceNotFound(source_dir.to_path_buf()));
    }

    let package = Package::from_directory(source_dir)?;

    let archive = match archive {
        Some(a) => a.to_path_buf(),
        None => policy
            .pack_destination(source_dir)
            .unwrap_or_else(|| fallback_pack_path(source_dir, now)),
    };
    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PackError::unwritable(parent, e))?;
    }

    package.write_to_file(&archive)?;
    info!(source = %source_dir.display(), archive = %archive.display(), entries = package.len(), "packed");

    Ok(PackOutcome {
        archive,
        entries: package.len(),
    })
}

/// `<parent>/<stem>_expanded` for an archive path
pub fn default_unpack_dir(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_string());
    archive.with_file_name(format!("{}_expanded", stem))
}

/// `requested` if free, otherwise `requested_<timestamp>` (then `_<n>`)
fn collision_free_dir(requested: &Path, now: DateTime<Utc>) -> PathBuf {
    if !requested.exists() {
        return requested.to_path_buf();
    }

    let name = requested
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "expanded".to_string());
    let stamped = format!("{}_{}", name, timestamp(now));

    let mut candidate = requested.with_file_name(&stamped);
    let mut counter = 1;
    while candidate.exists() {
        candidate = requested.with_file_name(format!("{}_{}", stamped, counter));
        counter += 1;
    }
    candidate
}
