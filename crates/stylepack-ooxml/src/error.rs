//! Error types for package and style operations

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while transforming packages or merging styles
#[derive(Error, Debug)]
pub enum PackError {
    /// Input archive, directory or snippet does not exist
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Target document does not exist
    #[error("Target not found: {}", .0.display())]
    TargetNotFound(PathBuf),

    /// Package has no style definitions part
    #[error("No styles part in package: {0}")]
    NoStylesPart(String),

    /// Snippet, archive or XML part could not be parsed
    #[error("Malformed input {}: {reason}", .path.display())]
    MalformedInput { path: PathBuf, reason: String },

    /// Requested fragment is not present in the snippet
    #[error("Fragment '{fragment}' not found (available: {})", format_available(.available))]
    FragmentNotFound {
        fragment: String,
        available: Vec<String>,
    },

    /// Selected fragment contains no usable style records
    #[error("No styles in fragment: {0}")]
    NoStylesInFragment(String),

    /// Target could not be opened or replaced for writing
    #[error("Target not writable {}: {reason}", .path.display())]
    TargetUnwritable { path: PathBuf, reason: String },

    /// Unknown document kind requested from the shell factory
    #[error("Unsupported document kind: {0}")]
    UnsupportedKind(String),

    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl PackError {
    /// Build a `MalformedInput` error for `path`
    pub fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PackError::MalformedInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `TargetUnwritable` error for `path`
    pub fn unwritable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PackError::TargetUnwritable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code distinguishing the failure kinds
    pub fn exit_code(&self) -> i32 {
        match self {
            PackError::SourceNotFound(_) | PackError::TargetNotFound(_) => 3,
            PackError::NoStylesPart(_)
            | PackError::NoStylesInFragment(_)
            | PackError::FragmentNotFound { .. } => 4,
            PackError::MalformedInput { .. }
            | PackError::Archive(_)
            | PackError::Xml(_)
            | PackError::Json(_)
            | PackError::Config(_) => 5,
            PackError::TargetUnwritable { .. } => 6,
            PackError::UnsupportedKind(_) => 7,
            PackError::Io(_) => 1,
        }
    }
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

/// Result type for package operations
pub type Result<T> = std::result::Result<T, PackError>;
