//! Style import workflows
//!
//! Open the target, compute the new styles part in memory, then write it back
//! in one step. Apart from the requested backup, which is taken before any
//! input is read, nothing reaches the disk unless the merge succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SnippetSettings;
use crate::error::{PackError, Result};
use crate::merge::{merge_fragment, replace_whole, MergeOptions, MergeReport};
use crate::package::{Package, STYLES_PART};
use crate::snippet::find_fragment;
use crate::styles::{self, load_or_create};

/// A style import into a target document (archive or expanded directory)
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// Document whose styles are updated
    pub target: PathBuf,
    /// Copy the target to `<target>.bak` before anything else is attempted
    pub backup: bool,
    /// Compute the result without writing anything
    pub dry_run: bool,
}

impl ImportRequest {
    /// Request with backup and dry run disabled
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            backup: false,
            dry_run: false,
        }
    }
}

/// Result of an import
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// Style changes
    pub report: MergeReport,
    /// Where the backup went, if one was made
    pub backup: Option<PathBuf>,
    /// Whether the target was written
    pub written: bool,
    /// Whether the target had no styles part before
    pub created_styles_part: bool,
    /// Snippet style elements that were skipped
    pub warnings: Vec<String>,
}

/// Replace the target's styles part with the one from `source`
pub fn import_from_document(request: &ImportRequest, source: &Path) -> Result<ImportOutcome> {
    let backup = prepare_target(request)?;
    if !source.exists() {
        return Err(PackError::SourceNotFound(source.to_path_buf()));
    }

    let source_part = styles::load(&Package::open(source)?)?;
    debug!(source = %source.display(), styles = source_part.styles.len(), "loaded source styles");

    let mut package = Package::open(&request.target)?;
    let (mut part, created) = load_or_create(&package)?;
    let report = replace_whole(&mut part, &source_part);

    let outcome = ImportOutcome {
        report,
        backup,
        written: false,
        created_styles_part: created,
        warnings: Vec::new(),
    };
    finish(request, &mut package, &part, outcome)
}

/// Merge the styles of one snippet fragment into the target
pub fn import_from_snippet(
    request: &ImportRequest,
    snippet: &Path,
    fragment_id: Option<&str>,
    settings: &SnippetSettings,
    options: MergeOptions,
) -> Result<ImportOutcome> {
    let backup = prepare_target(request)?;
    let fragment = find_fragment(snippet, fragment_id, settings)?;
    if fragment.styles.is_empty() {
        return Err(PackError::NoStylesInFragment(
            fragment_id.filter(|id| !id.is_empty()).unwrap_or("<root>").to_string(),
        ));
    }

    let mut package = Package::open(&request.target)?;
    let (mut part, created) = load_or_create(&package)?;
    let report = merge_fragment(&mut part.styles, &fragment.styles, options)?;

    let outcome = ImportOutcome {
        report,
        backup,
        written: false,
        created_styles_part: created,
        warnings: fragment.warnings,
    };
    finish(request, &mut package, &part, outcome)
}

/// Check the target and take the backup, if requested, before any input is
/// read. A dry run never writes, so it takes no backup.
fn prepare_target(request: &ImportRequest) -> Result<Option<PathBuf>> {
    let target = &request.target;
    if !target.exists() {
        return Err(PackError::TargetNotFound(target.clone()));
    }
    if request.dry_run {
        return Ok(None);
    }
    ensure_writable(target)?;
    if request.backup {
        return Ok(Some(backup(target)?));
    }
    Ok(None)
}

fn finish(
    request: &ImportRequest,
    package: &mut Package,
    part: &styles::StylesPart,
    mut outcome: ImportOutcome,
) -> Result<ImportOutcome> {
    if request.dry_run {
        info!(target = %request.target.display(), "dry run, target left unchanged");
        return Ok(outcome);
    }

    styles::save(package, part)?;
    package.persist()?;
    outcome.written = true;
    info!(target = %request.target.display(), "styles written");
    Ok(outcome)
}

/// Fail early for read-only targets, before any work is done
fn ensure_writable(target: &Path) -> Result<()> {
    let checked = if target.is_dir() {
        target.join(STYLES_PART)
    } else {
        target.to_path_buf()
    };
    let readonly = match fs::metadata(&checked) {
        Ok(meta) => meta.permissions().readonly(),
        Err(_) => false,
    };
    if readonly {
        return Err(PackError::unwritable(checked, "file is read-only"));
    }
    Ok(())
}

/// `<target>.bak` path
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    target.with_file_name(name)
}

/// Copy the target beside itself, replacing an older backup
pub(crate) fn backup(target: &Path) -> Result<PathBuf> {
    let dest = backup_path(target);
    if target.is_dir() {
        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(|e| PackError::unwritable(&dest, e))?;
        }
        Package::from_directory(target)?.write_to_directory(&dest)?;
    } else {
        fs::copy(target, &dest).map_err(|e| PackError::unwritable(&dest, e))?;
    }
    debug!(backup = %dest.display(), "backup created");
    Ok(dest)
}
