//! Element span scanning over raw XML bytes
//!
//! Style definitions are kept as verbatim markup, so instead of building a
//! DOM we record where every element starts and ends in the source text.
//! Callers slice the original bytes with these offsets.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One element located in the source text
#[derive(Debug, Clone)]
pub(crate) struct ElementSpan {
    /// Qualified tag name as written (e.g. `w:style`)
    pub name: String,
    /// Attributes as (qualified key, unescaped value)
    pub attrs: Vec<(String, String)>,
    /// Byte offset of the opening `<`
    pub start: usize,
    /// Byte offset just past the closing `>` of the end tag
    pub end: usize,
    /// Nesting depth (root is 0)
    pub depth: usize,
    /// Written as `<tag/>`
    pub empty: bool,
}

impl ElementSpan {
    /// Local part of the tag name (after any prefix)
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Look up an attribute by local name, ignoring any prefix
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| local_part(key) == local)
            .map(|(_, value)| value.as_str())
    }

    /// Whether `other` lies strictly inside this element
    pub fn contains(&self, other: &ElementSpan) -> bool {
        other.start > self.start && other.end <= self.end
    }
}

pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Scan every element in `xml`, in document order.
///
/// Fails with a human-readable reason when the input is not well-formed:
/// mismatched or unclosed tags, no root element, or content after the root.
pub(crate) fn scan_elements(xml: &[u8]) -> std::result::Result<Vec<ElementSpan>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut elements: Vec<ElementSpan> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut roots = 0usize;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("{} at byte {}", e, reader.buffer_position()))?;
        let after = reader.buffer_position() as usize;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let depth = open.len();
                if depth == 0 {
                    roots += 1;
                    if roots > 1 {
                        return Err(format!("multiple root elements at byte {}", before));
                    }
                }
                elements.push(ElementSpan {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    attrs: read_attrs(e)?,
                    start: tag_start(xml, before, after),
                    end: if empty { after } else { 0 },
                    depth,
                    empty,
                });
                if !empty {
                    open.push(elements.len() - 1);
                }
            }
            Event::End(_) => match open.pop() {
                Some(index) => elements[index].end = after,
                None => return Err(format!("unexpected end tag at byte {}", before)),
            },
            Event::Text(ref t) if open.is_empty() => {
                let text = t
                    .unescape()
                    .map_err(|e| format!("{} at byte {}", e, before))?;
                if !text.trim().is_empty() {
                    return Err(format!("text outside the root element at byte {}", before));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(&index) = open.last() {
        return Err(format!("unclosed element <{}>", elements[index].name));
    }
    if elements.is_empty() {
        return Err("no root element".to_string());
    }

    Ok(elements)
}

fn read_attrs(e: &BytesStart) -> std::result::Result<Vec<(String, String)>, String> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        attrs.push((key, value.into_owned()));
    }
    Ok(attrs)
}

/// Locate the `<` that opens the tag read between `before` and `after`.
fn tag_start(xml: &[u8], before: usize, after: usize) -> usize {
    let upper = after.min(xml.len());
    match xml[before.min(upper)..upper].iter().position(|b| *b == b'<') {
        Some(offset) => before + offset,
        None => before.saturating_sub(1),
    }
}

/// Offset of the closing tag of a non-empty element (`</name>`)
pub(crate) fn closing_tag_start(xml: &[u8], span: &ElementSpan) -> usize {
    let window = &xml[span.start..span.end];
    window
        .windows(2)
        .rposition(|w| w == b"</")
        .map(|p| span.start + p)
        .unwrap_or(span.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_slice_back_to_source() {
        let xml = br#"<?xml version="1.0"?>
<w:styles xmlns:w="urn:w">
  <w:style w:styleId="A"><w:name w:val="a"/></w:style>
  <w:style w:styleId="B"/>
</w:styles>"#;
        let elements = scan_elements(xml).unwrap();
        let styles: Vec<_> = elements
            .iter()
            .filter(|e| e.local_name() == "style")
            .collect();
        assert_eq!(styles.len(), 2);
        assert_eq!(
            &xml[styles[0].start..styles[0].end],
            br#"<w:style w:styleId="A"><w:name w:val="a"/></w:style>"#
        );
        assert_eq!(&xml[styles[1].start..styles[1].end], br#"<w:style w:styleId="B"/>"#);
        assert_eq!(styles[0].attr("styleId"), Some("A"));
        assert_eq!(styles[0].depth, 1);
    }

    #[test]
    fn test_unclosed_element_is_rejected() {
        let err = scan_elements(b"<root><child></root>").unwrap_err();
        assert!(!err.is_empty());
        assert!(scan_elements(b"<root><child>").is_err());
    }

    #[test]
    fn test_empty_input_has_no_root() {
        assert_eq!(scan_elements(b"").unwrap_err(), "no root element");
    }

    #[test]
    fn test_closing_tag_start() {
        let xml = b"<a><b/></a>";
        let elements = scan_elements(xml).unwrap();
        assert_eq!(closing_tag_start(xml, &elements[0]), 7);
    }
}
