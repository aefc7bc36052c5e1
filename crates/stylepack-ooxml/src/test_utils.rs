//! Shared test fixtures for stylepack-ooxml
//!
//! Builders for small in-memory word processing packages with a known set of
//! styles.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

use crate::package::Package;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
</Relationships>"#;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Fixture</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

/// Paragraph style elements for `ids`, each named `<id> <marker>`
pub fn styles_xml(ids: &[&str], marker: &str) -> String {
    ids.iter()
        .map(|id| {
            format!(
                r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{id} {marker}"/></w:style>"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n  ")
}

/// A complete `word/styles.xml` holding paragraph styles `ids`
pub fn styles_part(ids: &[&str], marker: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults><w:rPrDefault><w:rPr><w:lang w:val="en-US"/></w:rPr></w:rPrDefault></w:docDefaults>
  {}
</w:styles>"#,
        styles_xml(ids, marker)
    )
}

/// Create a minimal DOCX, with `styles` as `word/styles.xml` when given
pub fn create_docx(styles: Option<&str>) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();

    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(PACKAGE_RELS.as_bytes()).unwrap();

    zip.start_file("word/_rels/document.xml.rels", options).unwrap();
    zip.write_all(DOCUMENT_RELS.as_bytes()).unwrap();

    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(DOCUMENT.as_bytes()).unwrap();

    if let Some(styles) = styles {
        zip.start_file("word/styles.xml", options).unwrap();
        zip.write_all(styles.as_bytes()).unwrap();
    }

    zip.finish().unwrap();
    buffer.into_inner()
}

/// Create a minimal DOCX whose styles part holds paragraph styles `ids`
pub fn create_docx_with_styles(ids: &[&str]) -> Vec<u8> {
    create_docx(Some(&styles_part(ids, "target")))
}

/// Write archive bytes to `dir/name`
pub fn write_docx(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Read one entry of an archive on disk
pub fn read_entry(archive: &Path, entry: &str) -> Option<String> {
    Package::open_archive(archive).unwrap().get_string(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_docx_with_styles() {
        let bytes = create_docx_with_styles(&["A", "B"]);
        let package = Package::from_reader(Cursor::new(bytes)).unwrap();
        assert!(package.contains("word/document.xml"));
        let styles = package.get_string("word/styles.xml").unwrap();
        assert!(styles.contains(r#"w:styleId="A""#));
        assert!(styles.contains(r#"<w:name w:val="B target"/>"#));
    }

    #[test]
    fn test_create_docx_without_styles() {
        let package = Package::from_reader(Cursor::new(create_docx(None))).unwrap();
        assert_eq!(package.len(), 4);
        assert!(!package.contains("word/styles.xml"));
    }
}
