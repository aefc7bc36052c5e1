//! Style merge engine
//!
//! Two strategies:
//!
//! - [`replace_whole`]: the target part becomes an exact copy of the source.
//! - [`merge_fragment`]: incoming records replace same-id target records and
//!   new ones are appended. Pre-existing styles keep their relative order and
//!   all snippet styles follow them in fragment order.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::MergeSettings;
use crate::error::{PackError, Result};
use crate::styles::{StyleKind, StyleRecord, StyleSet, StylesPart};

/// Suffix of the character companion Word links to a paragraph style
const COMPANION_SUFFIX: &str = "Char";

/// Options for [`merge_fragment`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Remove a target `<Id>Char` companion when the fragment supplies
    /// paragraph style `<Id>` without it
    pub drop_orphan_companions: bool,
}

impl From<MergeSettings> for MergeOptions {
    fn from(settings: MergeSettings) -> Self {
        Self {
            drop_orphan_companions: settings.drop_orphan_companions,
        }
    }
}

/// What a merge changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Target styles overwritten by a record with the same id
    pub replaced: Vec<String>,
    /// Styles new to the target
    pub added: Vec<String>,
    /// Target styles dropped without replacement
    pub removed: Vec<String>,
}

impl MergeReport {
    /// Total number of styles touched
    pub fn total(&self) -> usize {
        self.replaced.len() + self.added.len() + self.removed.len()
    }
}

/// Replace the target part with a deep copy of `source`.
///
/// No identity matching takes place: styles only present in the target are
/// gone afterwards. Applying the same source twice gives the same result.
pub fn replace_whole(target: &mut StylesPart, source: &StylesPart) -> MergeReport {
    let incoming = source.styles.id_set();
    let existing = target.styles.id_set();

    let mut report = MergeReport::default();
    for id in source.styles.ids() {
        if existing.contains(id) {
            report.replaced.push(id.to_string());
        } else {
            report.added.push(id.to_string());
        }
    }
    report.removed = target
        .styles
        .ids()
        .into_iter()
        .filter(|id| !incoming.contains(id))
        .map(str::to_string)
        .collect();

    *target = source.clone_whole();
    info!(
        styles = target.styles.len(),
        replaced = report.replaced.len(),
        added = report.added.len(),
        removed = report.removed.len(),
        "replaced style definitions"
    );
    report
}

/// Merge `incoming` into `target` by style id.
///
/// Fails with [`PackError::NoStylesInFragment`] when there is nothing to
/// merge; `target` is left untouched in that case.
pub fn merge_fragment(
    target: &mut StyleSet,
    incoming: &StyleSet,
    options: MergeOptions,
) -> Result<MergeReport> {
    if incoming.is_empty() {
        return Err(PackError::NoStylesInFragment(
            "fragment has no style definitions".to_string(),
        ));
    }

    let incoming_ids = incoming.id_set();
    let orphans = if options.drop_orphan_companions {
        orphan_companions(incoming, &incoming_ids)
    } else {
        HashSet::new()
    };

    let mut report = MergeReport::default();
    let mut kept: Vec<StyleRecord> = Vec::with_capacity(target.len() + incoming.len());

    for record in target.take_records() {
        if incoming_ids.contains(record.id.as_str()) {
            debug!(id = %record.id, "replacing style");
            report.replaced.push(record.id);
        } else if orphans.contains(record.id.as_str()) {
            debug!(id = %record.id, "dropping orphaned companion style");
            report.removed.push(record.id);
        } else {
            kept.push(record);
        }
    }

    // report in fragment order
    let existing: HashSet<String> = report.replaced.drain(..).collect();
    for id in incoming.ids() {
        if existing.contains(id) {
            report.replaced.push(id.to_string());
        } else {
            report.added.push(id.to_string());
        }
    }

    kept.extend(incoming.iter().cloned());
    target.replace_records(kept);

    info!(
        replaced = report.replaced.len(),
        added = report.added.len(),
        removed = report.removed.len(),
        "merged fragment styles"
    );
    Ok(report)
}

/// Companion ids that would be left pointing at a replaced paragraph style
fn orphan_companions(incoming: &StyleSet, incoming_ids: &HashSet<&str>) -> HashSet<String> {
    incoming
        .iter()
        .filter(|r| r.kind == StyleKind::Paragraph)
        .map(|r| format!("{}{}", r.id, COMPANION_SUFFIX))
        .filter(|companion| !incoming_ids.contains(companion.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, marker: &str) -> StyleRecord {
        StyleRecord::from_markup(
            format!(r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{marker}"/></w:style>"#),
            0,
        )
        .unwrap()
    }

    fn char_record(id: &str) -> StyleRecord {
        StyleRecord::from_markup(format!(r#"<w:style w:type="character" w:styleId="{id}"/>"#), 0)
            .unwrap()
    }

    fn set(ids: &[&str], marker: &str) -> StyleSet {
        StyleSet::from_records(ids.iter().map(|id| record(id, marker)).collect())
    }

    #[test]
    fn test_merge_partitions_existing_before_incoming() {
        let mut target = set(&["A", "B", "C"], "old");
        let incoming = set(&["B", "D"], "new");

        let report = merge_fragment(&mut target, &incoming, MergeOptions::default()).unwrap();

        assert_eq!(target.ids(), vec!["A", "C", "B", "D"]);
        assert_eq!(target.get("B").unwrap().name.as_deref(), Some("new"));
        assert_eq!(target.get("A").unwrap().name.as_deref(), Some("old"));
        assert_eq!(report.replaced, vec!["B"]);
        assert_eq!(report.added, vec!["D"]);
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_merge_without_collisions_appends() {
        let mut target = set(&["A", "B"], "old");
        let report =
            merge_fragment(&mut target, &set(&["C"], "new"), MergeOptions::default()).unwrap();
        assert_eq!(target.ids(), vec!["A", "B", "C"]);
        assert_eq!(report.added, vec!["C"]);
        assert!(report.replaced.is_empty());
    }

    #[test]
    fn test_merge_is_deterministic() {
        let incoming = set(&["C", "A"], "new");
        let mut first = set(&["A", "B", "C"], "old");
        let mut second = first.clone();
        merge_fragment(&mut first, &incoming, MergeOptions::default()).unwrap();
        merge_fragment(&mut second, &incoming, MergeOptions::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.ids(), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_empty_fragment_leaves_target_untouched() {
        let mut target = set(&["A"], "old");
        let before = target.clone();
        let err = merge_fragment(&mut target, &StyleSet::new(), MergeOptions::default())
            .unwrap_err();
        assert!(matches!(err, PackError::NoStylesInFragment(_)));
        assert_eq!(target, before);
    }

    #[test]
    fn test_ids_compare_case_sensitively() {
        let mut target = set(&["heading1"], "old");
        merge_fragment(&mut target, &set(&["Heading1"], "new"), MergeOptions::default()).unwrap();
        assert_eq!(target.ids(), vec!["heading1", "Heading1"]);
    }

    #[test]
    fn test_companions_kept_by_default() {
        let mut target =
            StyleSet::from_records(vec![record("Heading1", "old"), char_record("Heading1Char")]);
        merge_fragment(&mut target, &set(&["Heading1"], "new"), MergeOptions::default()).unwrap();
        assert_eq!(target.ids(), vec!["Heading1Char", "Heading1"]);
    }

    #[test]
    fn test_drop_orphan_companions() {
        let mut target = StyleSet::from_records(vec![
            record("Heading1", "old"),
            char_record("Heading1Char"),
            char_record("QuoteChar"),
        ]);
        let options = MergeOptions {
            drop_orphan_companions: true,
        };
        let report = merge_fragment(&mut target, &set(&["Heading1"], "new"), options).unwrap();
        assert_eq!(target.ids(), vec!["QuoteChar", "Heading1"]);
        assert_eq!(report.removed, vec!["Heading1Char"]);
    }

    #[test]
    fn test_companion_supplied_by_fragment_is_replaced() {
        let mut target =
            StyleSet::from_records(vec![record("Title", "old"), char_record("TitleChar")]);
        let incoming = StyleSet::from_records(vec![record("Title", "new"), char_record("TitleChar")]);
        let options = MergeOptions {
            drop_orphan_companions: true,
        };
        let report = merge_fragment(&mut target, &incoming, options).unwrap();
        assert_eq!(report.replaced, vec!["Title", "TitleChar"]);
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_replace_whole_is_exact_and_idempotent() {
        let source = StylesPart::parse(
            br#"<w:styles xmlns:w="urn:w">
  <w:style w:styleId="X"/>
  <w:style w:styleId="B"/>
</w:styles>"#,
        )
        .unwrap();
        let mut target = StylesPart::parse(
            br#"<w:styles xmlns:w="urn:w"><w:style w:styleId="A"/><w:style w:styleId="B"/></w:styles>"#,
        )
        .unwrap();

        let report = replace_whole(&mut target, &source);
        assert_eq!(target, source);
        assert_eq!(target.to_xml(), source.to_xml());
        assert_eq!(report.replaced, vec!["B"]);
        assert_eq!(report.added, vec!["X"]);
        assert_eq!(report.removed, vec!["A"]);

        let once = target.to_xml();
        replace_whole(&mut target, &source);
        assert_eq!(target.to_xml(), once);
    }
}
