//! In-memory OOXML packages
//!
//! A package is the same tree of named parts whether it lives in a ZIP
//! archive (`.docx`, `.dotx`, ...) or in an expanded directory. Packages are
//! read completely into memory; the file handle is released before anything
//! is written back.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::{PackError, Result};

/// Package content types part, always written first
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Package-level relationships part
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";

/// Style definitions part of a word processing document
pub const STYLES_PART: &str = "word/styles.xml";

/// Relationships of the main word processing document part
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Where a package was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// A ZIP archive on disk
    Archive(PathBuf),
    /// An expanded directory tree
    Directory(PathBuf),
    /// Built in memory
    Memory,
}

/// An OOXML package: unique relative paths mapped to byte payloads
#[derive(Debug, Clone)]
pub struct Package {
    entries: BTreeMap<String, Vec<u8>>,
    source: PackageSource,
    /// Entries changed since the package was read
    dirty: BTreeSet<String>,
    /// Entries removed since the package was read
    removed: BTreeSet<String>,
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

impl Package {
    /// Create an empty in-memory package
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            source: PackageSource::Memory,
            dirty: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Open a package from either a ZIP archive or an expanded directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_directory(path)
        } else if path.is_file() {
            Self::open_archive(path)
        } else {
            Err(PackError::SourceNotFound(path.to_path_buf()))
        }
    }

    /// Open and unpack a ZIP archive
    pub fn open_archive<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PackError::SourceNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let mut package = Self::from_reader(file).map_err(|e| match e {
            PackError::Archive(inner) => PackError::malformed(path, inner),
            PackError::MalformedInput { reason, .. } => PackError::malformed(path, reason),
            other => other,
        })?;
        package.source = PackageSource::Archive(path.to_path_buf());
        Ok(package)
    }

    /// Read every entry of a ZIP archive from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut package = Self::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if file.is_dir() || name.ends_with('/') {
                continue;
            }

            if file.enclosed_name().is_none() {
                return Err(PackError::malformed(
                    name.as_str(),
                    "entry path escapes the package root",
                ));
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            package.entries.insert(name, contents);
        }

        Ok(package)
    }

    /// Read every file below `dir` as a package entry
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(PackError::SourceNotFound(dir.to_path_buf()));
        }

        let pattern = format!(
            "{}/**/*",
            glob::Pattern::escape(&dir.display().to_string())
        );
        let paths = glob::glob(&pattern).map_err(|e| PackError::malformed(dir, e))?;

        let mut package = Self::new();
        for entry in paths {
            let path = entry.map_err(|e| PackError::Io(e.into_error()))?;
            if !path.is_file() {
                continue;
            }
            let name = entry_name(dir, &path)?;
            debug!(entry = %name, "reading directory entry");
            package.entries.insert(name, fs::read(&path)?);
        }

        package.source = PackageSource::Directory(dir.to_path_buf());
        Ok(package)
    }

    /// Where this package was read from
    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    /// Get an entry's contents by path
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(|v| v.as_slice())
    }

    /// Get an entry's contents as a string
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.entries
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Check if an entry exists
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// All entry paths, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the package has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set or update an entry's contents
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        let path = path.into();
        self.removed.remove(&path);
        self.dirty.insert(path.clone());
        self.entries.insert(path, contents);
    }

    /// Set an entry's contents from a string
    pub fn set_string(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.set(path, contents.into().into_bytes());
    }

    /// Remove an entry
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        let removed = self.entries.remove(path);
        if removed.is_some() {
            self.dirty.remove(path);
            self.removed.insert(path.to_string());
        }
        removed
    }

    /// Whether any entry changed since the package was read
    pub fn is_modified(&self) -> bool {
        !self.dirty.is_empty() || !self.removed.is_empty()
    }

    /// Write the package as a ZIP archive to any writer.
    ///
    /// `[Content_Types].xml` comes first, the remaining entries follow in
    /// path order. Entries are deflated at the maximum level.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9));

        let ordered = self
            .entries
            .iter()
            .filter(|(path, _)| path.as_str() == CONTENT_TYPES_PART)
            .chain(
                self.entries
                    .iter()
                    .filter(|(path, _)| path.as_str() != CONTENT_TYPES_PART),
            );

        for (path, contents) in ordered {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(contents)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Write the package as a ZIP archive at `path`.
    ///
    /// The archive is assembled in a temporary sibling file first; an existing
    /// file at `path` is only deleted once that succeeded.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let temp = sibling_temp_path(path);

        let written = File::create(&temp)
            .map_err(|e| PackError::unwritable(path, e))
            .and_then(|file| self.write_to(file));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        replace_file(&temp, path)
    }

    /// Write every entry as a file below `dest`.
    ///
    /// Files are staged in a hidden sibling directory which is renamed to
    /// `dest` at the end, so a failure leaves no partial expansion. `dest`
    /// must not exist yet.
    pub fn write_to_directory<P: AsRef<Path>>(&self, dest: P) -> Result<()> {
        let dest = dest.as_ref();
        if dest.exists() {
            return Err(PackError::unwritable(dest, "destination already exists"));
        }
        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(parent).map_err(|e| PackError::unwritable(parent, e))?;

        let staging = sibling_temp_path(dest);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }

        let written = self.write_entries_into(&staging);
        if let Err(e) = written {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        fs::rename(&staging, dest).map_err(|e| {
            let _ = fs::remove_dir_all(&staging);
            PackError::unwritable(dest, e)
        })
    }

    fn write_entries_into(&self, root: &Path) -> Result<()> {
        fs::create_dir_all(root).map_err(|e| PackError::unwritable(root, e))?;
        for (name, contents) in &self.entries {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| PackError::unwritable(parent, e))?;
            }
            debug!(entry = %name, bytes = contents.len(), "writing entry");
            fs::write(&path, contents).map_err(|e| PackError::unwritable(&path, e))?;
        }
        Ok(())
    }

    /// Persist changes back to where the package was read from.
    ///
    /// Archives are rewritten whole through a temporary file. Directories only
    /// get their changed entries replaced, each atomically.
    pub fn persist(&mut self) -> Result<()> {
        match self.source.clone() {
            PackageSource::Archive(path) => {
                if self.is_modified() {
                    self.write_to_file(&path)?;
                }
            }
            PackageSource::Directory(dir) => {
                for name in &self.dirty {
                    if let Some(contents) = self.entries.get(name) {
                        let path = dir.join(name);
                        if let Some(parent) = path.parent() {
                            fs::create_dir_all(parent)
                                .map_err(|e| PackError::unwritable(parent, e))?;
                        }
                        write_atomic(&path, contents)?;
                    }
                }
                for name in &self.removed {
                    let path = dir.join(name);
                    if path.is_file() {
                        fs::remove_file(&path).map_err(|e| PackError::unwritable(&path, e))?;
                    }
                }
            }
            PackageSource::Memory => {
                return Err(PackError::unwritable(
                    "<memory>",
                    "package was not read from disk",
                ));
            }
        }
        self.dirty.clear();
        self.removed.clear();
        Ok(())
    }
}

/// Convert a file path below `root` to a forward-slash entry name
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| PackError::malformed(path, e))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Hidden temporary path next to `path`
pub(crate) fn sibling_temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_string());
    path.with_file_name(format!(".{}.stylepack-{}.tmp", name, std::process::id()))
}

/// Write `contents` to `path` through a temporary sibling and a rename
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let temp = sibling_temp_path(path);
    if let Err(e) = fs::write(&temp, contents) {
        let _ = fs::remove_file(&temp);
        return Err(PackError::unwritable(path, e));
    }
    replace_file(&temp, path)
}

fn replace_file(temp: &Path, path: &Path) -> Result<()> {
    if path.is_file() {
        if let Err(e) = fs::remove_file(path) {
            let _ = fs::remove_file(temp);
            return Err(PackError::unwritable(path, e));
        }
    }
    fs::rename(temp, path).map_err(|e| {
        let _ = fs::remove_file(temp);
        PackError::unwritable(path, e)
    })
}
