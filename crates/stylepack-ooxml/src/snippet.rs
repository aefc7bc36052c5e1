//! Labeled style fragments inside auxiliary XML files
//!
//! A snippet file holds one or more fragments. The root element is always a
//! fragment; any descendant whose local name is a configured marker
//! (`snippet`, `fragment`) and which carries an identifier is one too.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SnippetSettings;
use crate::error::{PackError, Result};
use crate::markup::{scan_elements, ElementSpan};
use crate::styles::{record_from_spans, StyleSet};

const STYLE_ID_ATTRIBUTE: &str = "styleId";

/// Style records selected from a snippet
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    /// Identifier of the selected fragment, `None` for an unlabeled root
    pub id: Option<String>,
    /// Style records in snippet order
    pub styles: StyleSet,
    /// Style elements that were skipped
    pub warnings: Vec<String>,
}

/// A parsed snippet file
#[derive(Debug)]
pub struct Snippet {
    text: String,
    elements: Vec<ElementSpan>,
    settings: SnippetSettings,
    origin: PathBuf,
}

impl Snippet {
    /// Parse snippet markup held in memory
    pub fn parse(xml: &[u8], settings: &SnippetSettings) -> Result<Self> {
        Self::parse_with_origin(xml, settings, PathBuf::from("<snippet>"))
    }

    fn parse_with_origin(xml: &[u8], settings: &SnippetSettings, origin: PathBuf) -> Result<Self> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| PackError::malformed(&origin, e))?
            .to_string();
        let elements =
            scan_elements(xml).map_err(|reason| PackError::malformed(&origin, reason))?;
        Ok(Self {
            text,
            elements,
            settings: settings.clone(),
            origin,
        })
    }

    /// Read and parse a snippet file
    pub fn open<P: AsRef<Path>>(path: P, settings: &SnippetSettings) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PackError::SourceNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Self::parse_with_origin(&bytes, settings, path.to_path_buf())
    }

    fn identifier<'a>(&self, element: &'a ElementSpan) -> Option<&'a str> {
        element.attr(&self.settings.id_attribute)
    }

    fn is_marker(&self, element: &ElementSpan) -> bool {
        self.settings
            .fragment_markers
            .iter()
            .any(|marker| marker == element.local_name())
    }

    /// Identifiers that can be selected, root first then markers in document order
    pub fn available(&self) -> Vec<String> {
        let mut ids = Vec::new();
        if let Some(id) = self.identifier(&self.elements[0]) {
            ids.push(id.to_string());
        }
        ids.extend(
            self.elements[1..]
                .iter()
                .filter(|e| self.is_marker(e))
                .filter_map(|e| self.identifier(e))
                .map(str::to_string),
        );
        ids
    }

    fn locate(&self, fragment_id: Option<&str>) -> Option<usize> {
        let root = &self.elements[0];
        match fragment_id.filter(|id| !id.is_empty()) {
            None => Some(0),
            Some(id) if self.identifier(root) == Some(id) => Some(0),
            Some(id) => self
                .elements
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, e)| self.is_marker(e) && self.identifier(e) == Some(id))
                .map(|(i, _)| i),
        }
    }

    /// Select a fragment and extract its style records.
    ///
    /// An empty or absent identifier selects the root element.
    pub fn fragment(&self, fragment_id: Option<&str>) -> Result<Fragment> {
        let index = self
            .locate(fragment_id)
            .ok_or_else(|| PackError::FragmentNotFound {
                fragment: fragment_id.unwrap_or_default().to_string(),
                available: self.available(),
            })?;
        let container = &self.elements[index];
        debug!(
            fragment = fragment_id.unwrap_or("<root>"),
            element = %container.name,
            "selected fragment"
        );

        let mut fragment = Fragment {
            id: self.identifier(container).map(str::to_string),
            ..Fragment::default()
        };
        let mut records = Vec::new();
        let mut inside_style: Option<usize> = None;

        for (i, element) in self.elements.iter().enumerate().skip(index + 1) {
            if element.start >= container.end {
                break;
            }
            if let Some(open) = inside_style {
                if self.elements[open].contains(element) {
                    continue;
                }
                inside_style = None;
            }
            if element.local_name() != "style" {
                continue;
            }
            inside_style = Some(i);

            let order = records.len();
            match record_from_spans(&self.text, &self.elements, i, order, STYLE_ID_ATTRIBUTE) {
                Some(record) => records.push(record),
                None => {
                    let message = format!(
                        "{}: style element at byte {} has no {}, skipped",
                        self.origin.display(),
                        element.start,
                        STYLE_ID_ATTRIBUTE
                    );
                    warn!("{}", message);
                    fragment.warnings.push(message);
                }
            }
        }

        fragment.styles = StyleSet::from_records(records);
        Ok(fragment)
    }
}

/// Open `snippet_path` and extract the requested fragment
pub fn find_fragment<P: AsRef<Path>>(
    snippet_path: P,
    fragment_id: Option<&str>,
    settings: &SnippetSettings,
) -> Result<Fragment> {
    Snippet::open(snippet_path, settings)?.fragment(fragment_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNIPPET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<snippets xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <snippet id="x">
    <w:styles>
      <w:style w:type="paragraph" w:styleId="B"><w:name w:val="B new"/></w:style>
      <w:style w:type="paragraph" w:styleId="D"><w:name w:val="D"/></w:style>
    </w:styles>
  </snippet>
  <fragment id="z">
    <w:style w:type="character" w:styleId="E"/>
  </fragment>
</snippets>"#;

    fn snippet() -> Snippet {
        Snippet::parse(SNIPPET.as_bytes(), &SnippetSettings::default()).unwrap()
    }

    #[test]
    fn test_root_fragment_collects_all_styles() {
        let fragment = snippet().fragment(None).unwrap();
        assert_eq!(fragment.id, None);
        assert_eq!(fragment.styles.ids(), vec!["B", "D", "E"]);
    }

    #[test]
    fn test_empty_id_selects_root() {
        let fragment = snippet().fragment(Some("")).unwrap();
        assert_eq!(fragment.styles.len(), 3);
    }

    #[test]
    fn test_named_fragment() {
        let fragment = snippet().fragment(Some("x")).unwrap();
        assert_eq!(fragment.id.as_deref(), Some("x"));
        assert_eq!(fragment.styles.ids(), vec!["B", "D"]);
        assert_eq!(
            fragment.styles.get("B").unwrap().raw(),
            r#"<w:style w:type="paragraph" w:styleId="B"><w:name w:val="B new"/></w:style>"#
        );
        assert_eq!(fragment.styles.get("D").unwrap().source_order, 1);
    }

    #[test]
    fn test_unknown_fragment_lists_available() {
        let err = snippet().fragment(Some("y")).unwrap_err();
        match err {
            PackError::FragmentNotFound {
                fragment,
                available,
            } => {
                assert_eq!(fragment, "y");
                assert_eq!(available, vec!["x", "z"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_root_identifier_matches_first() {
        let xml = r#"<snippet id="x"><fragment id="x"><w:style w:styleId="Inner"/></fragment><w:style w:styleId="Outer"/></snippet>"#;
        let snippet = Snippet::parse(xml.as_bytes(), &SnippetSettings::default()).unwrap();
        let fragment = snippet.fragment(Some("x")).unwrap();
        assert_eq!(fragment.styles.ids(), vec!["Inner", "Outer"]);
        assert_eq!(snippet.available(), vec!["x", "x"]);
    }

    #[test]
    fn test_identifiers_are_case_sensitive() {
        assert!(snippet().fragment(Some("X")).is_err());
    }

    #[test]
    fn test_style_without_id_is_skipped() {
        let xml = r#"<snippet><w:style w:type="paragraph"/><w:style w:styleId="A"/></snippet>"#;
        let snippet = Snippet::parse(xml.as_bytes(), &SnippetSettings::default()).unwrap();
        let fragment = snippet.fragment(None).unwrap();
        assert_eq!(fragment.styles.ids(), vec!["A"]);
        assert_eq!(fragment.warnings.len(), 1);
    }

    #[test]
    fn test_fragment_without_styles_is_empty() {
        let xml = r#"<snippet><fragment id="n"><w:p/></fragment></snippet>"#;
        let snippet = Snippet::parse(xml.as_bytes(), &SnippetSettings::default()).unwrap();
        assert!(snippet.fragment(Some("n")).unwrap().styles.is_empty());
    }

    #[test]
    fn test_malformed_snippet() {
        let err = Snippet::parse(b"<snippet><a></snippet>", &SnippetSettings::default())
            .unwrap_err();
        assert!(matches!(err, PackError::MalformedInput { .. }));
    }

    #[test]
    fn test_find_fragment_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let err = find_fragment(
            temp.path().join("missing.xml"),
            None,
            &SnippetSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PackError::SourceNotFound(_)));
    }

    #[test]
    fn test_custom_markers() {
        let settings = SnippetSettings {
            fragment_markers: vec!["part".to_string()],
            id_attribute: "name".to_string(),
        };
        let xml = r#"<root><part name="p1"><w:style w:styleId="A"/></part><snippet id="s"/></root>"#;
        let snippet = Snippet::parse(xml.as_bytes(), &settings).unwrap();
        assert_eq!(snippet.available(), vec!["p1"]);
        assert_eq!(snippet.fragment(Some("p1")).unwrap().styles.ids(), vec!["A"]);
    }
}
