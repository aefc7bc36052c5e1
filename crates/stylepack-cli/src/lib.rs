//! stylepack CLI - Command-line interface library
//!
//! This library provides the CLI functionality for stylepack, including:
//! - Pack / Unpack: Move between OOXML archives and expanded directories
//! - Styles import: Replace or merge `word/styles.xml` definitions
//! - Create / Validate / Clean: Shell documents and package hygiene
//!
//! # Library Usage
//!
//! ```ignore
//! use stylepack_cli::{run_cli, validate_command, OutputFormat};
//!
//! // Run the full CLI
//! run_cli()?;
//!
//! // Or use individual commands programmatically
//! validate_command(Path::new("Normal.dotm"), OutputFormat::Json)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Expand a template, edit it, pack it again
//! stylepack unpack Normal.dotm
//! stylepack pack Normal_expanded Normal.dotm
//!
//! # Merge one fragment of a snippet file
//! stylepack styles-import-snippet Normal.dotm partials/headings.xml heading-styles --backup
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{
    clean_command, create_command, load_settings, pack_command, snippets_manifest_command,
    styles_import_command, styles_import_snippet_command, test_clean_command, unpack_command,
    validate_command,
};
pub use app::{run, run_cli, Cli, OutputFormat};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` directives apply on top of the default level (`warn`, or
/// `debug` when `verbose`).
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    // a subscriber may already be installed by an embedding program
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
