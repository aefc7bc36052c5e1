//! Cleanup passes for WordprocessingML parts
//!
//! Word sprinkles editing metadata (revision save ids, paragraph ids,
//! proofing flags) over every part it writes. These passes strip it so
//! expanded templates diff cleanly.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PackError, Result};
use crate::import::backup;
use crate::package::{Package, STYLES_PART};
use crate::styles::StylesPart;

/// Character styles Word links to built-in paragraph styles
pub const LINKED_CHAR_STYLES: [&str; 13] = [
    "Heading1Char",
    "Heading2Char",
    "Heading3Char",
    "Heading4Char",
    "Heading5Char",
    "Heading6Char",
    "Heading7Char",
    "Heading8Char",
    "Heading9Char",
    "QuoteChar",
    "SubtitleChar",
    "HeaderChar",
    "FooterChar",
];

/// Parts cleaned when none are selected
pub const DEFAULT_PARTS: &str = "word/*.xml";

/// A single cleanup pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupPass {
    /// `w:rsid*`, `w14:paraId` and `w14:textId` attributes
    Tracking,
    /// `<w:rsid w:val="…" />` lines
    StyleRsids,
    /// `<w:noProof/>` run properties
    NoProof,
    /// `Heading1Char`-style companions and the links to them
    LinkedCharStyles,
}

impl CleanupPass {
    pub const ALL: [CleanupPass; 4] = [
        CleanupPass::Tracking,
        CleanupPass::StyleRsids,
        CleanupPass::NoProof,
        CleanupPass::LinkedCharStyles,
    ];

    pub fn id(self) -> &'static str {
        match self {
            CleanupPass::Tracking => "tracking",
            CleanupPass::StyleRsids => "style-rsids",
            CleanupPass::NoProof => "no-proof",
            CleanupPass::LinkedCharStyles => "linked-char-styles",
        }
    }

    /// Apply the pass to a part's text
    pub fn apply(self, part: &str, text: &str) -> Result<(String, Counts)> {
        let mut counts = Counts::new();
        let cleaned = match self {
            CleanupPass::Tracking => {
                let mut out = text.to_string();
                for (category, re) in [
                    ("rsid", tracking_rsid_re()),
                    ("paraId", para_id_re()),
                    ("textId", text_id_re()),
                ] {
                    out = remove_all(re, &out, category, &mut counts);
                }
                out
            }
            CleanupPass::StyleRsids => remove_all(rsid_element_re(), text, "rsid", &mut counts),
            CleanupPass::NoProof => {
                let out = remove_all(no_proof_block_re(), text, "rPr", &mut counts);
                remove_all(no_proof_re(), &out, "noProof", &mut counts)
            }
            CleanupPass::LinkedCharStyles => {
                if part != STYLES_PART {
                    return Ok((text.to_string(), counts));
                }
                remove_linked_char_styles(text, &mut counts)?
            }
        };
        Ok((cleaned, counts))
    }
}

impl fmt::Display for CleanupPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CleanupPass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CleanupPass::ALL
            .iter()
            .copied()
            .find(|p| p.id() == s)
            .ok_or_else(|| format!("unknown cleanup pass: {}", s))
    }
}

/// Removed items per category
pub type Counts = BTreeMap<&'static str, usize>;

fn tracking_rsid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#" w:rsid[A-Za-z]*="[0-9A-Fa-f]{8}""#).unwrap())
}

fn para_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#" w14:paraId="[0-9A-Fa-f]{8}""#).unwrap())
}

fn text_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#" w14:textId="[0-9A-Fa-f]{8}""#).unwrap())
}

fn rsid_element_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?m)^[ \t]*<w:rsid w:val="[0-9A-F]+" />[\r\n]*"#).unwrap())
}

fn no_proof_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]*<w:rPr>\s*<w:noProof/>\s*</w:rPr>[\r\n]*").unwrap())
}

fn no_proof_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]*<w:noProof/>[\r\n]*").unwrap())
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let names = LINKED_CHAR_STYLES.join("|");
        Regex::new(&format!(
            r#"(?m)^[ \t]*<w:link w:val="(?:{names})"\s*/>[ \t]*\r?\n|<w:link w:val="(?:{names})"\s*/>"#
        ))
        .unwrap()
    })
}

fn remove_all(re: &Regex, text: &str, category: &'static str, counts: &mut Counts) -> String {
    let found = re.find_iter(text).count();
    if found == 0 {
        return text.to_string();
    }
    *counts.entry(category).or_default() += found;
    re.replace_all(text, "").into_owned()
}

fn remove_linked_char_styles(text: &str, counts: &mut Counts) -> Result<String> {
    let mut part = StylesPart::parse(text.as_bytes())?;
    let mut removed = 0;
    for id in LINKED_CHAR_STYLES {
        if part.styles.remove(id).is_some() {
            removed += 1;
        }
    }
    if removed > 0 {
        counts.insert("styles", removed);
    }
    Ok(remove_all(link_re(), &part.to_xml(), "links", counts))
}

/// Result of cleaning a package
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Counts per changed part
    pub parts: BTreeMap<String, Counts>,
    /// Backup location, if one was made
    pub backup: Option<PathBuf>,
    /// Whether the package was written
    pub written: bool,
}

impl CleanupReport {
    /// Total number of removed items
    pub fn total(&self) -> usize {
        self.parts.values().flat_map(|c| c.values()).sum()
    }
}

/// Options for [`clean_package`]
#[derive(Debug, Clone, Default)]
pub struct CleanupOptions {
    /// Passes to run; all of them when empty
    pub passes: Vec<CleanupPass>,
    /// Entry paths or glob patterns; [`DEFAULT_PARTS`] when empty
    pub parts: Vec<String>,
    /// Copy the package to `<path>.bak` first
    pub backup: bool,
    /// Report without writing
    pub dry_run: bool,
}

/// Run cleanup passes over the selected parts of a package
pub fn clean_package(path: &Path, options: &CleanupOptions) -> Result<CleanupReport> {
    let mut package = Package::open(path)?;

    let passes: Vec<CleanupPass> = if options.passes.is_empty() {
        CleanupPass::ALL.to_vec()
    } else {
        options.passes.clone()
    };
    let patterns = part_patterns(&options.parts)?;

    let selected: Vec<String> = package
        .paths()
        .filter(|p| patterns.iter().any(|pat| pat.matches(p)))
        .map(str::to_string)
        .collect();

    let mut report = CleanupReport::default();
    for name in selected {
        let Some(original) = package.get_string(&name) else {
            continue;
        };
        let mut text = original.clone();
        let mut part_counts = Counts::new();
        for pass in &passes {
            let (cleaned, counts) = pass.apply(&name, &text)?;
            text = cleaned;
            for (category, n) in counts {
                *part_counts.entry(category).or_default() += n;
            }
        }
        if text != original {
            debug!(part = %name, removed = part_counts.values().sum::<usize>(), "cleaned part");
            package.set_string(name.clone(), text);
            report.parts.insert(name, part_counts);
        }
    }

    if options.dry_run || !package.is_modified() {
        return Ok(report);
    }

    if options.backup {
        report.backup = Some(backup(path)?);
    }

    package.persist()?;
    report.written = true;
    info!(package = %path.display(), removed = report.total(), "cleanup complete");
    Ok(report)
}

fn part_patterns(parts: &[String]) -> Result<Vec<glob::Pattern>> {
    let defaults = [DEFAULT_PARTS.to_string()];
    let parts = if parts.is_empty() { &defaults[..] } else { parts };
    parts
        .iter()
        .map(|p| glob::Pattern::new(p).map_err(|e| PackError::malformed(p.as_str(), e)))
        .collect()
}
