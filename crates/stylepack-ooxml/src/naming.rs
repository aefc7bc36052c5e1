//! Default output naming for `pack`
//!
//! Templates are usually kept as `<template>/in/` expansions. Packing such a
//! directory without an explicit output writes `<template>/out/<file>`, with
//! the file name chosen by keyword rules against the template directory name.
//! The convention lives behind [`NamingPolicy`] so callers can swap it out.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::PackSettings;

/// Chooses where `pack` writes when no destination is given
pub trait NamingPolicy {
    /// Destination for packing `source_dir`, or `None` if the policy has no opinion
    fn pack_destination(&self, source_dir: &Path) -> Option<PathBuf>;
}

/// The `<template>/in` → `<template>/out/<file>` convention
///
/// `out` is a sibling of `in`, not of the template directory. Layouts that
/// collect every output in one `out` per category (`<category>/out/<file>`)
/// can set `out_dir_name = "../out"`, which is joined onto the template
/// directory as written.
#[derive(Debug, Clone, Default)]
pub struct ConventionNaming {
    settings: PackSettings,
}

impl ConventionNaming {
    /// Build the policy from pack settings
    pub fn new(settings: PackSettings) -> Self {
        Self { settings }
    }

    /// File name for a template directory name
    pub fn file_name(&self, template_name: &str) -> String {
        match self
            .settings
            .rules
            .iter()
            .find(|rule| rule.matches(template_name))
        {
            Some(rule) => {
                let stem = rule.stem.as_deref().unwrap_or(template_name);
                format!("{}.{}", stem, rule.extension)
            }
            None => format!("{}.{}", template_name, self.settings.default_extension),
        }
    }
}

impl NamingPolicy for ConventionNaming {
    fn pack_destination(&self, source_dir: &Path) -> Option<PathBuf> {
        let name = source_dir.file_name()?.to_str()?;
        if !name.eq_ignore_ascii_case(&self.settings.in_dir_name) {
            return None;
        }
        let template_dir = source_dir.parent()?;
        let template_name = template_dir.file_name()?.to_str()?;
        Some(
            template_dir
                .join(&self.settings.out_dir_name)
                .join(self.file_name(template_name)),
        )
    }
}

/// Temporary-directory destination used when no policy applies
pub fn fallback_pack_path(source_dir: &Path, now: DateTime<Utc>) -> PathBuf {
    let name = source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "packed".to_string());
    let safe_name = name.replace(['/', '\\'], "_");
    std::env::temp_dir().join(format!("{}_{}.packed", safe_name, timestamp(now)))
}

/// UTC timestamp used in generated names (`yyyyMMddHHmmss`)
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamingRule;
    use chrono::TimeZone;

    fn policy() -> ConventionNaming {
        ConventionNaming::new(PackSettings::default())
    }

    #[test]
    fn test_keyword_rules() {
        let policy = policy();
        assert_eq!(policy.file_name("AgencyNormal"), "Normal.dotm");
        assert_eq!(policy.file_name("budget-sheet"), "Sheet.xltx");
        assert_eq!(policy.file_name("WorkBook"), "Book.xltx");
        assert_eq!(policy.file_name("BrandTheme"), "BrandTheme.thmx");
        assert_eq!(policy.file_name("Memo2024"), "Memo2024.dotx");
        assert_eq!(policy.file_name("Plain"), "Plain.dotx");
    }

    #[test]
    fn test_in_directory_maps_to_sibling_out() {
        let dest = policy()
            .pack_destination(Path::new("builds/agency/letters/Letterhead/in"))
            .unwrap();
        assert_eq!(
            dest,
            PathBuf::from("builds/agency/letters/Letterhead/out/Letterhead.dotx")
        );
    }

    #[test]
    fn test_in_name_is_case_insensitive() {
        assert!(policy().pack_destination(Path::new("T/IN")).is_some());
    }

    #[test]
    fn test_other_directories_have_no_opinion() {
        assert!(policy().pack_destination(Path::new("work/expanded")).is_none());
    }

    #[test]
    fn test_category_level_out_directory() {
        let policy = ConventionNaming::new(PackSettings {
            out_dir_name: "../out".to_string(),
            ..PackSettings::default()
        });
        assert_eq!(
            policy.pack_destination(Path::new("builds/letters/Letterhead/in")),
            Some(PathBuf::from("builds/letters/Letterhead/../out/Letterhead.dotx"))
        );
    }

    #[test]
    fn test_custom_settings() {
        let settings = PackSettings {
            in_dir_name: "src".to_string(),
            out_dir_name: "dist".to_string(),
            default_extension: "docx".to_string(),
            rules: vec![NamingRule {
                keywords: vec!["report".to_string()],
                stem: Some("Report".to_string()),
                extension: "dotx".to_string(),
            }],
        };
        let policy = ConventionNaming::new(settings);
        assert_eq!(
            policy.pack_destination(Path::new("a/MonthlyReport/src")),
            Some(PathBuf::from("a/MonthlyReport/dist/Report.dotx"))
        );
        assert_eq!(
            policy.pack_destination(Path::new("a/Other/src")),
            Some(PathBuf::from("a/Other/dist/Other.docx"))
        );
    }

    #[test]
    fn test_fallback_path_in_temp_dir() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let path = fallback_pack_path(Path::new("some/expanded"), now);
        assert_eq!(path.parent().unwrap(), std::env::temp_dir().as_path());
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "expanded_20240305070809.packed"
        );
    }
}
