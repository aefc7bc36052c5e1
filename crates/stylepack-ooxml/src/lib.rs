//! # stylepack-ooxml
//!
//! Office Open XML package handling and style merging for stylepack.
//!
//! This crate provides functionality to:
//! - Pack expanded directories into OOXML archives and unpack them again
//! - Read and write `word/styles.xml` with every style kept verbatim
//! - Merge style sets, either wholesale or from labeled snippet fragments
//! - Create minimal Word, Excel and PowerPoint documents
//! - Strip editing metadata and check package structure
//!
//! ## Example: Merging a Snippet
//!
//! ```no_run
//! use stylepack_ooxml::{import_from_snippet, ImportRequest, MergeOptions, SnippetSettings};
//! use std::path::Path;
//!
//! let request = ImportRequest::new("Normal.dotm");
//! let outcome = import_from_snippet(
//!     &request,
//!     Path::new("partials/headings.xml"),
//!     Some("heading-styles"),
//!     &SnippetSettings::default(),
//!     MergeOptions::default(),
//! )?;
//!
//! println!("replaced {:?}, added {:?}", outcome.report.replaced, outcome.report.added);
//! # Ok::<(), stylepack_ooxml::PackError>(())
//! ```

pub mod artifacts;
pub mod cleanup;
pub mod codec;
pub mod config;
pub mod error;
pub mod import;
pub mod manifest;
mod markup;
pub mod merge;
pub mod naming;
pub mod package;
pub mod shell;
pub mod snippet;
pub mod styles;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod validate;

pub use artifacts::{clean_artifacts, test_clean, CleanSummary};
pub use cleanup::{clean_package, CleanupOptions, CleanupPass, CleanupReport};
pub use codec::{pack, unpack, PackOutcome, UnpackOutcome};
pub use config::{MergeSettings, NamingRule, PackSettings, Settings, SnippetSettings};
pub use error::{PackError, Result};
pub use import::{import_from_document, import_from_snippet, ImportOutcome, ImportRequest};
pub use manifest::{build_manifest, write_manifest, SnippetEntry, SnippetManifest, MANIFEST_FILE};
pub use merge::{merge_fragment, replace_whole, MergeOptions, MergeReport};
pub use naming::{ConventionNaming, NamingPolicy};
pub use package::{Package, PackageSource};
pub use shell::{build_shell, create_shell, DocumentKind, OfficeApp};
pub use snippet::{find_fragment, Fragment, Snippet};
pub use styles::{StyleKind, StyleRecord, StyleSet, StylesPart};
pub use validate::{validate_package, Diagnostic, Severity, ValidationEngine, ValidationReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
