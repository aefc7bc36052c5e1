//! Structural package validation
//!
//! Checks the packaging rules Office relies on when opening a file. Each
//! check implements [`PackageCheck`]; [`ValidationEngine`] runs them and
//! collects [`Diagnostic`]s. This is not schema validation: part contents
//! only have to be well-formed.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::markup::scan_elements;
use crate::package::{Package, CONTENT_TYPES_PART, PACKAGE_RELS_PART};

const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A problem found in a package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Check code (e.g. "PKG1")
    pub code: &'static str,
    pub message: String,
    /// Part the diagnostic refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            part: None,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    /// Attach the part path
    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.part = Some(part.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: severity[code]: message
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(ref part) = self.part {
            write!(f, "\n  --> {}", part)?;
        }
        Ok(())
    }
}

/// A single structural check
pub trait PackageCheck {
    /// Unique check code
    fn code(&self) -> &'static str;

    fn validate(&self, package: &Package) -> Vec<Diagnostic>;
}

/// Outcome of validating a package
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Human-readable listing, one diagnostic per block
    pub fn to_text(&self) -> String {
        if self.diagnostics.is_empty() {
            return "No problems found".to_string();
        }
        let mut out: Vec<String> = self.diagnostics.iter().map(|d| d.to_string()).collect();
        out.push(format!(
            "{} error(s), {} warning(s)",
            self.error_count(),
            self.diagnostics.len() - self.error_count()
        ));
        out.join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs a set of checks over a package
pub struct ValidationEngine {
    checks: Vec<Box<dyn PackageCheck>>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ValidationEngine {
    /// Engine without checks
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Engine with the standard packaging checks
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.add_check(Box::new(ContentTypesPresent));
        engine.add_check(Box::new(MainDocumentRelationship));
        engine.add_check(Box::new(WellFormedParts));
        engine.add_check(Box::new(ContentTypeCoverage));
        engine
    }

    pub fn add_check(&mut self, check: Box<dyn PackageCheck>) {
        self.checks.push(check);
    }

    pub fn check_codes(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.code()).collect()
    }

    pub fn validate(&self, package: &Package) -> ValidationReport {
        ValidationReport {
            diagnostics: self
                .checks
                .iter()
                .flat_map(|check| check.validate(package))
                .collect(),
        }
    }
}

/// Validate a package with the default checks
pub fn validate_package(package: &Package) -> ValidationReport {
    ValidationEngine::with_defaults().validate(package)
}

struct ContentTypesPresent;

impl PackageCheck for ContentTypesPresent {
    fn code(&self) -> &'static str {
        "PKG1"
    }

    fn validate(&self, package: &Package) -> Vec<Diagnostic> {
        if package.contains(CONTENT_TYPES_PART) {
            Vec::new()
        } else {
            vec![Diagnostic::error(self.code(), "missing [Content_Types].xml")]
        }
    }
}

struct MainDocumentRelationship;

impl PackageCheck for MainDocumentRelationship {
    fn code(&self) -> &'static str {
        "PKG2"
    }

    fn validate(&self, package: &Package) -> Vec<Diagnostic> {
        let Some(rels) = package.get(PACKAGE_RELS_PART) else {
            return vec![Diagnostic::error(self.code(), "missing package relationships")
                .with_part(PACKAGE_RELS_PART)];
        };
        // well-formedness is reported by PKG3
        let Ok(elements) = scan_elements(rels) else {
            return Vec::new();
        };

        let main = elements.iter().find(|e| {
            e.local_name() == "Relationship" && e.attr("Type") == Some(OFFICE_DOCUMENT_REL)
        });
        match main.and_then(|e| e.attr("Target")) {
            None => vec![Diagnostic::error(self.code(), "no officeDocument relationship")
                .with_part(PACKAGE_RELS_PART)],
            Some(target) => {
                let part = target.trim_start_matches('/');
                if package.contains(part) {
                    Vec::new()
                } else {
                    vec![Diagnostic::error(
                        self.code(),
                        format!("main document part '{}' does not exist", part),
                    )
                    .with_part(PACKAGE_RELS_PART)]
                }
            }
        }
    }
}

struct WellFormedParts;

impl PackageCheck for WellFormedParts {
    fn code(&self) -> &'static str {
        "PKG3"
    }

    fn validate(&self, package: &Package) -> Vec<Diagnostic> {
        package
            .paths()
            .filter(|p| is_xml_part(p) || p.ends_with(".rels"))
            .filter_map(|path| {
                let bytes = package.get(path)?;
                scan_elements(bytes).err().map(|reason| {
                    Diagnostic::error(self.code(), format!("not well-formed: {}", reason))
                        .with_part(path)
                })
            })
            .collect()
    }
}

struct ContentTypeCoverage;

impl PackageCheck for ContentTypeCoverage {
    fn code(&self) -> &'static str {
        "PKG4"
    }

    fn validate(&self, package: &Package) -> Vec<Diagnostic> {
        let Some(types) = package.get(CONTENT_TYPES_PART) else {
            return Vec::new();
        };
        let Ok(elements) = scan_elements(types) else {
            return Vec::new();
        };

        let mut defaults = HashSet::new();
        let mut overrides = HashSet::new();
        for element in &elements {
            match element.local_name() {
                "Default" => {
                    if let Some(ext) = element.attr("Extension") {
                        defaults.insert(ext.to_ascii_lowercase());
                    }
                }
                "Override" => {
                    if let Some(name) = element.attr("PartName") {
                        overrides.insert(name.trim_start_matches('/').to_string());
                    }
                }
                _ => {}
            }
        }

        package
            .paths()
            .filter(|p| *p != CONTENT_TYPES_PART && is_xml_part(p))
            .filter(|p| !overrides.contains(*p) && !defaults.contains("xml"))
            .map(|p| {
                Diagnostic::warning(self.code(), "part has no content type").with_part(p)
            })
            .collect()
    }
}

fn is_xml_part(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".xml")
}
