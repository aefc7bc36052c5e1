//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use stylepack_ooxml::{
    build_manifest, clean_package, create_shell, import_from_document, import_from_snippet, pack,
    test_clean, unpack, validate_package, write_manifest, CleanupOptions, CleanupPass,
    ConventionNaming, DocumentKind, ImportOutcome, ImportRequest, MergeOptions, Package, PackError,
    Settings,
};

/// Output format for validation reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tool consumption
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "stylepack")]
#[command(author, version, about = "OOXML package and style tooling", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress an expanded directory into an OOXML archive
    Pack {
        /// Expanded package directory
        dir: PathBuf,

        /// Output archive (derived from the directory name when omitted)
        out: Option<PathBuf>,
    },

    /// Expand an OOXML archive into a directory
    Unpack {
        /// Input archive
        archive: PathBuf,

        /// Output directory (defaults to `<name>_expanded`)
        dir: Option<PathBuf>,
    },

    /// Replace the target's styles with those of another document
    StylesImport {
        /// Document or expanded directory to update
        target: PathBuf,

        /// Document or expanded directory supplying the styles
        source: PathBuf,

        /// Copy the target to `<target>.bak` first
        #[arg(long)]
        backup: bool,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Merge the styles of a snippet fragment into the target
    StylesImportSnippet {
        /// Document or expanded directory to update
        target: PathBuf,

        /// Snippet XML file
        snippet: PathBuf,

        /// Fragment id (the whole snippet when omitted or empty)
        fragment: Option<String>,

        /// Copy the target to `<target>.bak` first
        #[arg(long)]
        backup: bool,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Remove `<Id>Char` styles the fragment no longer provides
        #[arg(long)]
        drop_orphan_companions: bool,
    },

    /// Create a minimal Word, Excel or PowerPoint document
    Create {
        /// Document kind (e.g. word-doc, xl-template, ppt-mpres)
        kind: String,

        /// File name (defaults to a name derived from the kind)
        name: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Check package structure
    Validate {
        /// Archive or expanded directory
        package: PathBuf,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Strip editing metadata from WordprocessingML parts
    Clean {
        /// Archive or expanded directory
        package: PathBuf,

        /// Cleanup pass to run (repeatable, all passes when omitted)
        #[arg(long = "pass")]
        passes: Vec<CleanupPass>,

        /// Part glob to process (repeatable, defaults to word/*.xml)
        #[arg(long = "part")]
        parts: Vec<String>,

        /// Copy the package to `<package>.bak` first
        #[arg(long)]
        backup: bool,

        /// Count removals without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Regenerate the snippet manifest of a directory
    SnippetsManifest {
        /// Snippet directory
        dir: PathBuf,

        /// Print the manifest instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove leftover expansion directories and packed archives
    TestClean {
        /// Clean the temp directory
        #[arg(long)]
        tmp: bool,

        /// Clean ./builds recursively
        #[arg(long)]
        out: bool,
    },
}

/// Run the CLI application
///
/// Parses arguments, installs logging and dispatches to the command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    crate::init_logging(cli.verbose);
    run(cli)
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Pack { dir, out } => pack_command(&dir, out.as_deref(), &settings),
        Commands::Unpack { archive, dir } => unpack_command(&archive, dir.as_deref()),
        Commands::StylesImport {
            target,
            source,
            backup,
            dry_run,
        } => {
            let request = ImportRequest {
                target,
                backup,
                dry_run,
            };
            styles_import_command(&request, &source)
        }
        Commands::StylesImportSnippet {
            target,
            snippet,
            fragment,
            backup,
            dry_run,
            drop_orphan_companions,
        } => {
            let request = ImportRequest {
                target,
                backup,
                dry_run,
            };
            let mut options = MergeOptions::from(settings.merge);
            options.drop_orphan_companions |= drop_orphan_companions;
            styles_import_snippet_command(
                &request,
                &snippet,
                fragment.as_deref(),
                &settings,
                options,
            )
        }
        Commands::Create { kind, name, dir } => create_command(&kind, name.as_deref(), &dir),
        Commands::Validate { package, format } => validate_command(&package, format),
        Commands::Clean {
            package,
            passes,
            parts,
            backup,
            dry_run,
        } => {
            let options = CleanupOptions {
                passes,
                parts,
                backup,
                dry_run,
            };
            clean_command(&package, &options)
        }
        Commands::SnippetsManifest { dir, dry_run } => snippets_manifest_command(&dir, dry_run),
        Commands::TestClean { tmp, out } => test_clean_command(tmp, out),
    }
}

/// Execute the pack command
pub fn pack_command(dir: &Path, out: Option<&Path>, settings: &Settings) -> Result<()> {
    let policy = ConventionNaming::new(settings.pack.clone());
    let outcome = pack(dir, out, &policy)
        .with_context(|| format!("Failed to pack directory: {}", dir.display()))?;

    println!(
        "Packed {} entries into {}",
        outcome.entries,
        outcome.archive.display()
    );
    Ok(())
}

/// Execute the unpack command
pub fn unpack_command(archive: &Path, dir: Option<&Path>) -> Result<()> {
    let outcome = unpack(archive, dir)
        .with_context(|| format!("Failed to unpack archive: {}", archive.display()))?;

    println!(
        "Unpacked {} entries into {}",
        outcome.entries,
        outcome.dest.display()
    );
    Ok(())
}

/// Execute the styles-import command
pub fn styles_import_command(request: &ImportRequest, source: &Path) -> Result<()> {
    let outcome = import_from_document(request, source).with_context(|| {
        format!(
            "Failed to import styles from {} into {}",
            source.display(),
            request.target.display()
        )
    })?;

    print_import(request, &outcome);
    Ok(())
}

/// Execute the styles-import-snippet command
pub fn styles_import_snippet_command(
    request: &ImportRequest,
    snippet: &Path,
    fragment: Option<&str>,
    settings: &Settings,
    options: MergeOptions,
) -> Result<()> {
    let outcome = import_from_snippet(request, snippet, fragment, &settings.snippet, options)
        .with_context(|| {
            format!(
                "Failed to merge snippet {} into {}",
                snippet.display(),
                request.target.display()
            )
        })?;

    print_import(request, &outcome);
    Ok(())
}

fn print_import(request: &ImportRequest, outcome: &ImportOutcome) {
    for warning in &outcome.warnings {
        println!("Warning: {}", warning);
    }

    let report = &outcome.report;
    if !report.replaced.is_empty() {
        println!("Replaced: {}", report.replaced.join(", "));
    }
    if !report.added.is_empty() {
        println!("Added: {}", report.added.join(", "));
    }
    if !report.removed.is_empty() {
        println!("Removed: {}", report.removed.join(", "));
    }
    if outcome.created_styles_part {
        println!("Created word/styles.xml");
    }
    if let Some(backup) = &outcome.backup {
        println!("Backup: {}", backup.display());
    }

    if outcome.written {
        println!(
            "Updated {} ({} styles changed)",
            request.target.display(),
            report.total()
        );
    } else {
        println!("Dry run: {} styles would change", report.total());
    }
}

/// Execute the create command
pub fn create_command(kind: &str, name: Option<&str>, dir: &Path) -> Result<()> {
    let kind: DocumentKind = kind.parse()?;
    let path = create_shell(kind, name, dir)
        .with_context(|| format!("Failed to create {} in {}", kind, dir.display()))?;

    println!("Created {}", path.display());
    Ok(())
}

/// Execute the validate command
pub fn validate_command(package: &Path, format: OutputFormat) -> Result<()> {
    if !package.exists() {
        return Err(PackError::SourceNotFound(package.to_path_buf()).into());
    }
    let opened = Package::open(package)
        .with_context(|| format!("Failed to open package: {}", package.display()))?;
    let report = validate_package(&opened);

    match format {
        OutputFormat::Text => println!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if report.has_errors() {
        anyhow::bail!(
            "{} error(s) found in {}",
            report.error_count(),
            package.display()
        );
    }
    Ok(())
}

/// Execute the clean command
pub fn clean_command(package: &Path, options: &CleanupOptions) -> Result<()> {
    let report = clean_package(package, options)
        .with_context(|| format!("Failed to clean package: {}", package.display()))?;

    for (part, counts) in &report.parts {
        let summary = counts
            .iter()
            .map(|(category, count)| format!("{}={}", category, count))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{}: {}", part, summary);
    }
    if let Some(backup) = &report.backup {
        println!("Backup: {}", backup.display());
    }

    let verb = if report.written { "Removed" } else { "Would remove" };
    println!("{} {} items", verb, report.total());
    Ok(())
}

/// Execute the snippets-manifest command
pub fn snippets_manifest_command(dir: &Path, dry_run: bool) -> Result<()> {
    let manifest = build_manifest(dir)
        .with_context(|| format!("Failed to scan snippets in {}", dir.display()))?;

    if dry_run {
        println!("{}", manifest.to_json()?);
        return Ok(());
    }

    let written = write_manifest(dir, &manifest)
        .with_context(|| format!("Failed to write manifest in {}", dir.display()))?;
    if let Some(backup) = &written.backup {
        println!("Previous manifest moved to {}", backup.display());
    }
    println!(
        "Wrote {} ({} snippets)",
        written.path.display(),
        manifest.snippets.len()
    );
    Ok(())
}

/// Execute the test-clean command
pub fn test_clean_command(tmp: bool, out: bool) -> Result<()> {
    let root = std::env::current_dir().context("Failed to resolve current directory")?;
    let summary = test_clean(tmp, out, &root)?;

    for dir in &summary.removed_dirs {
        println!("Removed {}", dir.display());
    }
    for file in &summary.removed_files {
        println!("Removed {}", file.display());
    }
    for skipped in &summary.skipped {
        println!("Skipped {} (not found)", skipped.display());
    }
    println!("Removed {} artifacts", summary.total());
    Ok(())
}

/// Load settings from a config file or use defaults
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Settings::from_toml_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))
        }
        None => {
            let candidates = ["stylepack.toml", ".stylepack.toml"];
            for candidate in candidates {
                if Path::new(candidate).exists() {
                    let content = fs::read_to_string(candidate)?;
                    if let Ok(settings) = Settings::from_toml_str(&content) {
                        return Ok(settings);
                    }
                }
            }
            Ok(Settings::default())
        }
    }
}
