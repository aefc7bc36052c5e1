//! Style definitions (word/styles.xml)
//!
//! Every `<w:style>` is kept as the exact markup it was read from. Only the
//! identifying bits (id, type, name and links to other styles) are extracted;
//! the merge engine never looks inside a definition. Everything around the
//! styles (declaration, `w:docDefaults`, `w:latentStyles`, the closing tag)
//! is carried through verbatim as well.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::error::{PackError, Result};
use crate::markup::{closing_tag_start, scan_elements, ElementSpan};
use crate::package::{Package, CONTENT_TYPES_PART, DOCUMENT_RELS_PART, STYLES_PART};

/// WordprocessingML main namespace
pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const STYLES_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// Type of style
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleKind {
    /// Paragraph style
    Paragraph,
    /// Character (run) style
    Character,
    /// Table style
    Table,
    /// Numbering style
    Numbering,
    /// Any other `w:type` value, kept as written
    Other(String),
}

impl StyleKind {
    fn from_attr(value: Option<&str>) -> Self {
        match value {
            None | Some("paragraph") => StyleKind::Paragraph,
            Some("character") => StyleKind::Character,
            Some("table") => StyleKind::Table,
            Some("numbering") => StyleKind::Numbering,
            Some(other) => StyleKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleKind::Paragraph => write!(f, "paragraph"),
            StyleKind::Character => write!(f, "character"),
            StyleKind::Table => write!(f, "table"),
            StyleKind::Numbering => write!(f, "numbering"),
            StyleKind::Other(value) => write!(f, "{}", value),
        }
    }
}

/// One style definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRecord {
    /// Style ID (`w:styleId`), compared exactly
    pub id: String,
    /// Style type
    pub kind: StyleKind,
    /// Display name
    pub name: Option<String>,
    /// Base style ID (for inheritance)
    pub based_on: Option<String>,
    /// Next style ID (for following paragraphs)
    pub next: Option<String>,
    /// Linked paragraph/character companion
    pub link: Option<String>,
    /// Position at load time
    pub source_order: usize,
    /// The `<w:style>` element exactly as read
    raw: String,
}

impl StyleRecord {
    /// Build a record from a single `<w:style>` element's markup
    pub fn from_markup(raw: impl Into<String>, source_order: usize) -> Result<Self> {
        let raw = raw.into();
        let elements = scan_elements(raw.as_bytes())
            .map_err(|reason| PackError::malformed("<style>", reason))?;
        record_from_spans(&raw, &elements, 0, source_order, "styleId").ok_or_else(|| {
            PackError::malformed("<style>", "style element without a style identifier")
        })
    }

    /// The verbatim definition markup
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Build a record from the style element at `index`, reading metadata from
/// its direct children. `None` when the identifier attribute is missing.
pub(crate) fn record_from_spans(
    text: &str,
    elements: &[ElementSpan],
    index: usize,
    source_order: usize,
    id_attribute: &str,
) -> Option<StyleRecord> {
    let style = &elements[index];
    let id = style.attr(id_attribute)?.to_string();

    let mut record = StyleRecord {
        id,
        kind: StyleKind::from_attr(style.attr("type")),
        name: None,
        based_on: None,
        next: None,
        link: None,
        source_order,
        raw: text[style.start..style.end].to_string(),
    };

    for child in elements[index + 1..]
        .iter()
        .take_while(|e| e.start < style.end)
        .filter(|e| e.depth == style.depth + 1)
    {
        let value = child.attr("val").map(str::to_string);
        match child.local_name() {
            "name" => record.name = value,
            "basedOn" => record.based_on = value,
            "next" => record.next = value,
            "link" => record.link = value,
            _ => {}
        }
    }

    Some(record)
}

/// Ordered collection of style records with unique IDs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSet {
    records: Vec<StyleRecord>,
}

impl StyleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records; later duplicates of an ID replace earlier ones in place
    pub fn from_records(records: Vec<StyleRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.upsert(record);
        }
        set
    }

    /// Insert or replace (keeping position) a record
    pub fn upsert(&mut self, record: StyleRecord) {
        match self.position(&record.id) {
            Some(pos) => self.records[pos] = record,
            None => self.records.push(record),
        }
    }

    /// Append a record; fails if the ID is already present
    pub fn push(&mut self, record: StyleRecord) -> std::result::Result<(), StyleRecord> {
        if self.contains(&record.id) {
            return Err(record);
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove a record by ID
    pub fn remove(&mut self, id: &str) -> Option<StyleRecord> {
        self.position(id).map(|pos| self.records.remove(pos))
    }

    /// Get a record by ID
    pub fn get(&self, id: &str) -> Option<&StyleRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Position of a record by ID
    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Check whether an ID is present
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// IDs in order
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Set of IDs
    pub fn id_set(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Records in order
    pub fn iter(&self) -> impl Iterator<Item = &StyleRecord> {
        self.records.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Deep copy preserving order and raw markup
    pub fn clone_whole(&self) -> Self {
        self.clone()
    }

    /// Replace the records wholesale
    pub(crate) fn replace_records(&mut self, records: Vec<StyleRecord>) {
        self.records = records;
    }

    /// Take the records out, leaving the set empty
    pub(crate) fn take_records(&mut self) -> Vec<StyleRecord> {
        std::mem::take(&mut self.records)
    }
}

impl<'a> IntoIterator for &'a StyleSet {
    type Item = &'a StyleRecord;
    type IntoIter = std::slice::Iter<'a, StyleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A parsed `word/styles.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesPart {
    /// Everything before the first style, up to its leading whitespace
    head: String,
    /// The style records
    pub styles: StyleSet,
    /// Verbatim text that preceded each style when the part was read
    leading: HashMap<String, String>,
    /// Whitespace placed before styles that were not read from this part
    separator: String,
    /// Everything after the last style
    tail: String,
}

impl StylesPart {
    /// A minimal part with no styles
    pub fn empty() -> Self {
        Self {
            head: format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<w:styles xmlns:w=\"{}\">",
                WORDML_NS
            ),
            styles: StyleSet::new(),
            leading: HashMap::new(),
            separator: String::new(),
            tail: "</w:styles>".to_string(),
        }
    }

    /// Parse styles from XML bytes.
    ///
    /// Gaps between styles (whitespace, comments, styles without an id) stay
    /// attached to the style that follows them, so an unmodified part
    /// serializes to the bytes it was read from.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| PackError::malformed(STYLES_PART, e))?;
        let elements =
            scan_elements(xml).map_err(|reason| PackError::malformed(STYLES_PART, reason))?;

        let root = &elements[0];
        let style_indices: Vec<usize> = elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.depth == 1 && e.local_name() == "style")
            .map(|(i, _)| i)
            .collect();

        let Some(&first) = style_indices.first() else {
            return Ok(Self::without_styles(text, root));
        };

        let first_start = elements[first].start;
        let head = text[..first_start].trim_end();
        let mut previous_end = head.len();

        let mut styles = StyleSet::new();
        let mut leading = HashMap::new();
        let mut separator: Option<String> = None;
        let mut pending = String::new();

        for (order, &index) in style_indices.iter().enumerate() {
            let span = &elements[index];
            pending.push_str(&text[previous_end..span.start]);
            previous_end = span.end;

            let Some(record) = record_from_spans(text, &elements, index, order, "styleId") else {
                debug!(offset = span.start, "keeping style without styleId as verbatim text");
                pending.push_str(&text[span.start..span.end]);
                continue;
            };

            let gap = std::mem::take(&mut pending);
            if !styles.is_empty() && gap.trim().is_empty() {
                separator.get_or_insert_with(|| gap.clone());
            }
            if styles.contains(&record.id) {
                debug!(id = %record.id, "duplicate style id, last definition wins");
            } else {
                leading.insert(record.id.clone(), gap);
            }
            styles.upsert(record);
        }

        let separator =
            separator.unwrap_or_else(|| trailing_whitespace(&text[..first_start]).to_string());
        pending.push_str(&text[previous_end..]);

        Ok(Self {
            head: head.to_string(),
            styles,
            leading,
            separator,
            tail: pending,
        })
    }

    fn without_styles(text: &str, root: &ElementSpan) -> Self {
        if root.empty {
            // `<w:styles .../>`: open it up so styles can be inserted later
            let open_end = root.end - 2;
            let open_tag = text[root.start..open_end].trim_end();
            Self {
                head: format!("{}{}>", &text[..root.start], open_tag),
                styles: StyleSet::new(),
                leading: HashMap::new(),
                separator: String::new(),
                tail: format!("</{}>{}", root.name, &text[root.end..]),
            }
        } else {
            let close = closing_tag_start(text.as_bytes(), root);
            Self {
                head: text[..close].to_string(),
                styles: StyleSet::new(),
                leading: HashMap::new(),
                separator: String::new(),
                tail: text[close..].to_string(),
            }
        }
    }

    /// Serialize in the current style order
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(
            self.head.len() + self.tail.len() + self.styles.iter().map(|r| r.raw.len() + 2).sum::<usize>(),
        );
        out.push_str(&self.head);
        for record in self.styles.iter() {
            let gap = self.leading.get(&record.id).unwrap_or(&self.separator);
            out.push_str(gap);
            out.push_str(&record.raw);
        }
        out.push_str(&self.tail);
        out
    }

    /// Deep copy of the whole part, byte-for-byte
    pub fn clone_whole(&self) -> Self {
        self.clone()
    }
}

fn trailing_whitespace(text: &str) -> &str {
    let trimmed = text.trim_end();
    &text[trimmed.len()..]
}

/// Load the styles part of a package
pub fn load(package: &Package) -> Result<StylesPart> {
    let xml = package
        .get(STYLES_PART)
        .ok_or_else(|| PackError::NoStylesPart(STYLES_PART.to_string()))?;
    StylesPart::parse(xml)
}

/// Load the styles part, or start from an empty one.
///
/// The flag is true when the part had to be created.
pub fn load_or_create(package: &Package) -> Result<(StylesPart, bool)> {
    match load(package) {
        Ok(part) => Ok((part, false)),
        Err(PackError::NoStylesPart(_)) => {
            debug!("package has no styles part, starting empty");
            Ok((StylesPart::empty(), true))
        }
        Err(e) => Err(e),
    }
}

/// Store a styles part into a package.
///
/// A newly added part is registered in `[Content_Types].xml` and the main
/// document relationships.
pub fn save(package: &mut Package, part: &StylesPart) -> Result<()> {
    let is_new = !package.contains(STYLES_PART);
    package.set_string(STYLES_PART, part.to_xml());
    if is_new {
        register_styles_part(package)?;
    }
    Ok(())
}

fn register_styles_part(package: &mut Package) -> Result<()> {
    if let Some(types) = package.get_string(CONTENT_TYPES_PART) {
        if !types.contains("/word/styles.xml") {
            let updated = insert_before_close(
                &types,
                "</Types>",
                &format!(
                    "<Override PartName=\"/word/styles.xml\" ContentType=\"{}\"/>",
                    STYLES_CONTENT_TYPE
                ),
            )
            .ok_or_else(|| PackError::malformed(CONTENT_TYPES_PART, "missing </Types>"))?;
            package.set_string(CONTENT_TYPES_PART, updated);
        }
    }

    let rels = package.get_string(DOCUMENT_RELS_PART).unwrap_or_else(|| {
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\"></Relationships>".to_string()
    });
    if rels.contains(STYLES_REL_TYPE) {
        return Ok(());
    }

    let elements = scan_elements(rels.as_bytes())
        .map_err(|reason| PackError::malformed(DOCUMENT_RELS_PART, reason))?;
    let next_id = elements
        .iter()
        .filter_map(|e| e.attr("Id"))
        .filter_map(|id| id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
        .max()
        .unwrap_or(0)
        + 1;

    let relationship = format!(
        "<Relationship Id=\"rId{}\" Type=\"{}\" Target=\"styles.xml\"/>",
        next_id, STYLES_REL_TYPE
    );
    let updated = if elements[0].empty {
        let root = &elements[0];
        format!(
            "{}>{}</{}>{}",
            rels[..root.end - 2].trim_end(),
            relationship,
            root.name,
            &rels[root.end..]
        )
    } else {
        insert_before_close(&rels, "</Relationships>", &relationship)
            .ok_or_else(|| PackError::malformed(DOCUMENT_RELS_PART, "missing </Relationships>"))?
    };
    package.set_string(DOCUMENT_RELS_PART, updated);
    Ok(())
}

fn insert_before_close(text: &str, close: &str, insert: &str) -> Option<String> {
    let pos = text.rfind(close)?;
    Some(format!("{}{}{}", &text[..pos], insert, &text[pos..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults><w:rPrDefault/></w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:link w:val="Heading1Char"/>
    <w:pPr><w:outlineLvl w:val="0"/></w:pPr>
  </w:style>
  <w:style w:type="character" w:customStyle="1" w:styleId="Heading1Char">
    <w:name w:val="Heading 1 Char"/>
    <w:link w:val="Heading1"/>
  </w:style>
</w:styles>"#;

    #[test]
    fn test_parse_extracts_metadata() {
        let part = StylesPart::parse(STYLES.as_bytes()).unwrap();
        assert_eq!(part.styles.ids(), vec!["Normal", "Heading1", "Heading1Char"]);

        let h1 = part.styles.get("Heading1").unwrap();
        assert_eq!(h1.kind, StyleKind::Paragraph);
        assert_eq!(h1.name.as_deref(), Some("heading 1"));
        assert_eq!(h1.based_on.as_deref(), Some("Normal"));
        assert_eq!(h1.next.as_deref(), Some("Normal"));
        assert_eq!(h1.link.as_deref(), Some("Heading1Char"));
        assert_eq!(h1.source_order, 1);
        assert!(h1.raw().starts_with("<w:style w:type=\"paragraph\" w:styleId=\"Heading1\">"));
        assert!(h1.raw().ends_with("</w:style>"));

        let ch = part.styles.get("Heading1Char").unwrap();
        assert_eq!(ch.kind, StyleKind::Character);
    }

    #[test]
    fn test_unmodified_part_serializes_identically() {
        let part = StylesPart::parse(STYLES.as_bytes()).unwrap();
        assert_eq!(part.to_xml(), STYLES);
    }

    #[test]
    fn test_mixed_gaps_and_comments_survive() {
        let xml = "<?xml version=\"1.0\"?>\r\n<w:styles xmlns:w=\"urn:w\">\n  <w:style w:styleId=\"A\"/>\n  <!-- headings -->\n  <w:style w:styleId=\"B\"/>\r\n  <w:style w:type=\"paragraph\"/>\r\n  <w:style w:styleId=\"C\"/>\r\n</w:styles>";
        let part = StylesPart::parse(xml.as_bytes()).unwrap();
        assert_eq!(part.styles.ids(), vec!["A", "B", "C"]);
        assert_eq!(part.to_xml(), xml);
        assert_eq!(part.clone_whole().to_xml(), xml);
    }

    #[test]
    fn test_comment_moves_with_following_style() {
        let xml = "<w:styles xmlns:w=\"urn:w\">\n  <w:style w:styleId=\"A\"/>\n  <!-- b -->\n  <w:style w:styleId=\"B\"/>\n  <w:style w:styleId=\"C\"/>\n</w:styles>";
        let mut part = StylesPart::parse(xml.as_bytes()).unwrap();
        let b = part.styles.remove("B").unwrap();
        part.styles.push(b).unwrap();
        part.styles
            .push(StyleRecord::from_markup(r#"<w:style w:styleId="D"/>"#, 3).unwrap())
            .unwrap();

        assert_eq!(
            part.to_xml(),
            "<w:styles xmlns:w=\"urn:w\">\n  <w:style w:styleId=\"A\"/>\n  <w:style w:styleId=\"C\"/>\n  <!-- b -->\n  <w:style w:styleId=\"B\"/>\n  <w:style w:styleId=\"D\"/>\n</w:styles>"
        );
    }

    #[test]
    fn test_save_keeps_current_order() {
        let mut part = StylesPart::parse(STYLES.as_bytes()).unwrap();
        let normal = part.styles.remove("Normal").unwrap();
        part.styles.push(normal).unwrap();

        let xml = part.to_xml();
        let reparsed = StylesPart::parse(xml.as_bytes()).unwrap();
        assert_eq!(reparsed.styles.ids(), vec!["Heading1", "Heading1Char", "Normal"]);
        assert!(xml.contains("<w:docDefaults><w:rPrDefault/></w:docDefaults>"));
    }

    #[test]
    fn test_parse_without_styles() {
        let xml = r#"<w:styles xmlns:w="urn:w"><w:docDefaults/></w:styles>"#;
        let mut part = StylesPart::parse(xml.as_bytes()).unwrap();
        assert!(part.styles.is_empty());
        assert_eq!(part.to_xml(), xml);

        part.styles
            .push(StyleRecord::from_markup(r#"<w:style w:styleId="A"/>"#, 0).unwrap())
            .unwrap();
        assert_eq!(
            part.to_xml(),
            r#"<w:styles xmlns:w="urn:w"><w:docDefaults/><w:style w:styleId="A"/></w:styles>"#
        );
    }

    #[test]
    fn test_parse_self_closing_root() {
        let mut part = StylesPart::parse(br#"<w:styles xmlns:w="urn:w"/>"#).unwrap();
        part.styles
            .push(StyleRecord::from_markup(r#"<w:style w:styleId="A"/>"#, 0).unwrap())
            .unwrap();
        assert_eq!(
            part.to_xml(),
            r#"<w:styles xmlns:w="urn:w"><w:style w:styleId="A"/></w:styles>"#
        );
    }

    #[test]
    fn test_malformed_styles() {
        let err = StylesPart::parse(b"<w:styles><w:style>").unwrap_err();
        assert!(matches!(err, PackError::MalformedInput { .. }));
    }

    #[test]
    fn test_style_set_operations() {
        let a = StyleRecord::from_markup(r#"<w:style w:styleId="A"/>"#, 0).unwrap();
        let b = StyleRecord::from_markup(r#"<w:style w:styleId="B"/>"#, 1).unwrap();
        let mut set = StyleSet::from_records(vec![a.clone(), b]);
        assert_eq!(set.len(), 2);
        assert!(set.push(a).is_err());
        assert_eq!(set.position("B"), Some(1));
        assert!(set.remove("A").is_some());
        assert_eq!(set.ids(), vec!["B"]);
        assert!(!set.contains("a"));
    }

    #[test]
    fn test_from_markup_requires_id() {
        assert!(StyleRecord::from_markup(r#"<w:style w:type="paragraph"/>"#, 0).is_err());
    }

    #[test]
    fn test_load_missing_part() {
        let package = Package::new();
        assert!(matches!(load(&package), Err(PackError::NoStylesPart(_))));
        let (part, created) = load_or_create(&package).unwrap();
        assert!(created);
        assert!(part.styles.is_empty());
    }

    #[test]
    fn test_save_registers_new_part() {
        let mut package = Package::new();
        package.set_string(
            CONTENT_TYPES_PART,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#,
        );
        package.set_string(
            DOCUMENT_RELS_PART,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="urn:x" Target="x.xml"/></Relationships>"#,
        );

        save(&mut package, &StylesPart::empty()).unwrap();

        let types = package.get_string(CONTENT_TYPES_PART).unwrap();
        assert!(types.contains(r#"PartName="/word/styles.xml""#));
        let rels = package.get_string(DOCUMENT_RELS_PART).unwrap();
        assert!(rels.contains(r#"Id="rId4""#));
        assert!(rels.contains(STYLES_REL_TYPE));

        let reloaded = load(&package).unwrap();
        assert!(reloaded.styles.is_empty());
    }
}
