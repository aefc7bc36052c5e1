//! Snippet manifest
//!
//! `partials-manifest.json` indexes the snippet files of a directory so
//! tooling can look fragments up by id without opening every file.

use std::fs;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PackError, Result};
use crate::markup::scan_elements;
use crate::package::write_atomic;

/// Manifest file name inside the snippet directory
pub const MANIFEST_FILE: &str = "partials-manifest.json";

/// Index of snippet files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetManifest {
    pub snippets: Vec<SnippetEntry>,
}

/// One snippet file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetEntry {
    /// Root `id` of a `<snippet>` root, otherwise the file stem
    pub id: String,
    /// Forward-slash path relative to the manifest directory
    pub path: String,
    /// Part the snippet feeds (`word:styles`, `word:numbering`) or empty
    pub target: String,
    pub tags: Vec<String>,
    pub status: String,
}

impl SnippetManifest {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, id: &str) -> Option<&SnippetEntry> {
        self.snippets.iter().find(|e| e.id == id)
    }
}

/// Scan `dir` recursively for snippet files.
///
/// Files that are not well-formed XML are left out.
pub fn build_manifest(dir: &Path) -> Result<SnippetManifest> {
    if !dir.is_dir() {
        return Err(PackError::SourceNotFound(dir.to_path_buf()));
    }

    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let base = glob::Pattern::escape(&dir.display().to_string());

    let mut snippets = Vec::new();
    for extension in ["xml", "xmlx"] {
        let pattern = format!("{}/**/*.{}", base, extension);
        let paths = glob::glob_with(&pattern, options).map_err(|e| PackError::malformed(dir, e))?;
        for path in paths {
            let path = path.map_err(|e| PackError::Io(e.into_error()))?;
            if !path.is_file() {
                continue;
            }
            match parse_entry(dir, &path)? {
                Some(entry) => snippets.push(entry),
                None => debug!(path = %path.display(), "skipping file that is not well-formed"),
            }
        }
    }

    snippets.sort_by(|a, b| (&a.id, &a.path).cmp(&(&b.id, &b.path)));
    Ok(SnippetManifest { snippets })
}

fn parse_entry(dir: &Path, path: &Path) -> Result<Option<SnippetEntry>> {
    let bytes = fs::read(path)?;
    let Ok(elements) = scan_elements(&bytes) else {
        return Ok(None);
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let root = &elements[0];
    let id = match root.local_name() {
        "snippet" => root
            .attr("id")
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or(stem),
        _ => stem,
    };

    let mut target: Option<&str> = None;
    let mut tags = Vec::new();
    for element in &elements {
        match element.local_name() {
            "numbering" | "abstractNum" | "num" => {
                target = Some("word:numbering");
                tags.push("numbering".to_string());
            }
            "style" => {
                target.get_or_insert("word:styles");
                tags.push("styles".to_string());
            }
            _ => {}
        }
    }
    tags.sort();
    tags.dedup();

    let relative = path.strip_prefix(dir).unwrap_or(path);
    let path = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");

    Ok(Some(SnippetEntry {
        id,
        path,
        target: target.unwrap_or_default().to_string(),
        tags,
        status: "active".to_string(),
    }))
}

/// Where a manifest was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestWrite {
    pub path: PathBuf,
    /// Previous manifest, moved aside
    pub backup: Option<PathBuf>,
}

/// Write `manifest` to `<dir>/partials-manifest.json`.
///
/// An existing manifest is moved to `partials-manifest.json.bak` first.
pub fn write_manifest(dir: &Path, manifest: &SnippetManifest) -> Result<ManifestWrite> {
    let path = dir.join(MANIFEST_FILE);
    let mut json = manifest.to_json()?;
    json.push('\n');

    let backup = if path.is_file() {
        let bak = dir.join(format!("{}.bak", MANIFEST_FILE));
        fs::rename(&path, &bak).map_err(|e| PackError::unwritable(&bak, e))?;
        Some(bak)
    } else {
        None
    };

    write_atomic(&path, json.as_bytes())?;
    info!(path = %path.display(), snippets = manifest.snippets.len(), "wrote snippet manifest");
    Ok(ManifestWrite { path, backup })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_build_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        write(dir, "headings.xml", r#"<snippet id="heading-styles"><w:style w:styleId="H1"/></snippet>"#);
        write(
            dir,
            "lists/bullets.xml",
            r#"<w:numbering><w:abstractNum/><w:style w:styleId="List"/></w:numbering>"#,
        );
        write(dir, "notes.XML", r#"<notes/>"#);
        write(dir, "broken.xml", "<snippet>");
        write(dir, "readme.txt", "not xml");

        let manifest = build_manifest(dir).unwrap();
        let ids: Vec<_> = manifest.snippets.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["bullets", "heading-styles", "notes"]);

        let bullets = manifest.get("bullets").unwrap();
        assert_eq!(bullets.path, "lists/bullets.xml");
        assert_eq!(bullets.target, "word:numbering");
        assert_eq!(bullets.tags, vec!["numbering", "styles"]);

        let headings = manifest.get("heading-styles").unwrap();
        assert_eq!(headings.target, "word:styles");
        assert_eq!(headings.status, "active");

        assert_eq!(manifest.get("notes").unwrap().target, "");
    }

    #[test]
    fn test_write_manifest_backs_up_previous() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        write(dir, "a.xml", r#"<snippet id="a"><w:style w:styleId="A"/></snippet>"#);
        write(dir, MANIFEST_FILE, "{\"snippets\": []}");

        let manifest = build_manifest(dir).unwrap();
        let written = write_manifest(dir, &manifest).unwrap();

        assert_eq!(written.backup, Some(dir.join("partials-manifest.json.bak")));
        let reloaded =
            SnippetManifest::from_json(&fs::read_to_string(&written.path).unwrap()).unwrap();
        assert_eq!(reloaded, manifest);
    }

    #[test]
    fn test_missing_directory() {
        let temp = tempfile::tempdir().unwrap();
        assert!(matches!(
            build_manifest(&temp.path().join("none")),
            Err(PackError::SourceNotFound(_))
        ));
    }
}
