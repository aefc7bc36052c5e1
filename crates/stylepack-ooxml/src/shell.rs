//! Minimal empty Office documents
//!
//! A shell is the smallest package each application opens: content types,
//! package relationships and the main part, plus one sheet for workbooks and
//! a master, layout and theme for presentations. Macro-enabled kinds only
//! differ in their main content type and extension.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::error::{PackError, Result};
use crate::package::{Package, CONTENT_TYPES_PART, PACKAGE_RELS_PART};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n";
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Office application a document kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeApp {
    /// WordprocessingML
    Word,
    /// SpreadsheetML
    Excel,
    /// PresentationML
    PowerPoint,
}

/// Document kinds the shell factory can create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    WordDocument,
    WordMacroDocument,
    WordTemplate,
    WordMacroTemplate,
    ExcelBook,
    ExcelMacroBook,
    ExcelTemplate,
    ExcelMacroTemplate,
    PowerPointPresentation,
    PowerPointMacroPresentation,
    PowerPointTemplate,
    PowerPointMacroTemplate,
}

impl DocumentKind {
    /// Every kind, in command-line listing order
    pub const ALL: [DocumentKind; 12] = [
        DocumentKind::WordDocument,
        DocumentKind::WordMacroDocument,
        DocumentKind::WordTemplate,
        DocumentKind::WordMacroTemplate,
        DocumentKind::ExcelBook,
        DocumentKind::ExcelMacroBook,
        DocumentKind::ExcelTemplate,
        DocumentKind::ExcelMacroTemplate,
        DocumentKind::PowerPointPresentation,
        DocumentKind::PowerPointMacroPresentation,
        DocumentKind::PowerPointTemplate,
        DocumentKind::PowerPointMacroTemplate,
    ];

    /// Command-line identifier
    pub fn id(self) -> &'static str {
        match self {
            DocumentKind::WordDocument => "word-doc",
            DocumentKind::WordMacroDocument => "word-mdoc",
            DocumentKind::WordTemplate => "word-template",
            DocumentKind::WordMacroTemplate => "word-mtemplate",
            DocumentKind::ExcelBook => "xl-book",
            DocumentKind::ExcelMacroBook => "xl-mbook",
            DocumentKind::ExcelTemplate => "xl-template",
            DocumentKind::ExcelMacroTemplate => "xl-mtemplate",
            DocumentKind::PowerPointPresentation => "ppt-pres",
            DocumentKind::PowerPointMacroPresentation => "ppt-mpres",
            DocumentKind::PowerPointTemplate => "ppt-template",
            DocumentKind::PowerPointMacroTemplate => "ppt-mtemplate",
        }
    }

    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::WordDocument => "docx",
            DocumentKind::WordMacroDocument => "docm",
            DocumentKind::WordTemplate => "dotx",
            DocumentKind::WordMacroTemplate => "dotm",
            DocumentKind::ExcelBook => "xlsx",
            DocumentKind::ExcelMacroBook => "xlsm",
            DocumentKind::ExcelTemplate => "xltx",
            DocumentKind::ExcelMacroTemplate => "xltm",
            DocumentKind::PowerPointPresentation => "pptx",
            DocumentKind::PowerPointMacroPresentation => "pptm",
            DocumentKind::PowerPointTemplate => "potx",
            DocumentKind::PowerPointMacroTemplate => "potm",
        }
    }

    pub fn app(self) -> OfficeApp {
        match self {
            DocumentKind::WordDocument
            | DocumentKind::WordMacroDocument
            | DocumentKind::WordTemplate
            | DocumentKind::WordMacroTemplate => OfficeApp::Word,
            DocumentKind::ExcelBook
            | DocumentKind::ExcelMacroBook
            | DocumentKind::ExcelTemplate
            | DocumentKind::ExcelMacroTemplate => OfficeApp::Excel,
            _ => OfficeApp::PowerPoint,
        }
    }

    pub fn is_macro_enabled(self) -> bool {
        matches!(
            self,
            DocumentKind::WordMacroDocument
                | DocumentKind::WordMacroTemplate
                | DocumentKind::ExcelMacroBook
                | DocumentKind::ExcelMacroTemplate
                | DocumentKind::PowerPointMacroPresentation
                | DocumentKind::PowerPointMacroTemplate
        )
    }

    /// Content type of the main document part
    pub fn main_content_type(self) -> &'static str {
        match self {
            DocumentKind::WordDocument => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"
            }
            DocumentKind::WordMacroDocument => "application/vnd.ms-word.document.macroEnabled.main+xml",
            DocumentKind::WordTemplate => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml"
            }
            DocumentKind::WordMacroTemplate => {
                "application/vnd.ms-word.template.macroEnabledTemplate.main+xml"
            }
            DocumentKind::ExcelBook => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"
            }
            DocumentKind::ExcelMacroBook => "application/vnd.ms-excel.sheet.macroEnabled.main+xml",
            DocumentKind::ExcelTemplate => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.template.main+xml"
            }
            DocumentKind::ExcelMacroTemplate => {
                "application/vnd.ms-excel.template.macroEnabled.main+xml"
            }
            DocumentKind::PowerPointPresentation => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"
            }
            DocumentKind::PowerPointMacroPresentation => {
                "application/vnd.ms-powerpoint.presentation.macroEnabled.main+xml"
            }
            DocumentKind::PowerPointTemplate => {
                "application/vnd.openxmlformats-officedocument.presentationml.template.main+xml"
            }
            DocumentKind::PowerPointMacroTemplate => {
                "application/vnd.ms-powerpoint.template.macroEnabled.main+xml"
            }
        }
    }

    /// File stem used when no name is given
    pub fn default_stem(self) -> &'static str {
        match self {
            DocumentKind::WordTemplate | DocumentKind::WordMacroTemplate => "Doc",
            DocumentKind::WordDocument | DocumentKind::WordMacroDocument => "Document",
            _ => match self.app() {
                OfficeApp::Excel => "Book",
                _ => "Presentation",
            },
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for DocumentKind {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        DocumentKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| PackError::UnsupportedKind(s.to_string()))
    }
}

/// Create an empty document of `kind` in `dir`.
///
/// The file is `<name>.<ext>`, with the kind's default stem when `name` is
/// `None`. An existing file with that name is replaced.
pub fn create_shell(kind: DocumentKind, name: Option<&str>, dir: &Path) -> Result<PathBuf> {
    let stem = name
        .map(|n| n.strip_suffix(&format!(".{}", kind.extension())).unwrap_or(n))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| kind.default_stem());
    let path = dir.join(format!("{}.{}", stem, kind.extension()));

    std::fs::create_dir_all(dir).map_err(|e| PackError::unwritable(dir, e))?;
    build_shell(kind).write_to_file(&path)?;
    info!(kind = %kind, path = %path.display(), "created document shell");
    Ok(path)
}

/// Build the package for an empty document of `kind`
pub fn build_shell(kind: DocumentKind) -> Package {
    let mut package = Package::new();
    match kind.app() {
        OfficeApp::Word => word_parts(&mut package, kind),
        OfficeApp::Excel => excel_parts(&mut package, kind),
        OfficeApp::PowerPoint => powerpoint_parts(&mut package, kind),
    }
    package
}

fn content_types(overrides: &[(&str, &str)]) -> String {
    let mut xml = format!(
        "{}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        XML_DECL
    );
    for (part, content_type) in overrides {
        xml.push_str(&format!(
            "<Override PartName=\"{}\" ContentType=\"{}\"/>",
            part, content_type
        ));
    }
    xml.push_str("</Types>");
    xml
}

/// Relationships part from (id, type suffix, target) triples
fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!("{}<Relationships xmlns=\"{}\">", XML_DECL, RELS_NS);
    for (id, kind, target) in rels {
        xml.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}/{}\" Target=\"{}\"/>",
            id, REL_BASE, kind, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn package_rels(main_part: &str) -> String {
    format!(
        "{}<Relationships xmlns=\"{}\"><Relationship Id=\"rId1\" Type=\"{}\" Target=\"{}\"/></Relationships>",
        XML_DECL, RELS_NS, OFFICE_DOCUMENT_REL, main_part
    )
}

fn word_parts(package: &mut Package, kind: DocumentKind) {
    package.set_string(
        CONTENT_TYPES_PART,
        content_types(&[("/word/document.xml", kind.main_content_type())]),
    );
    package.set_string(PACKAGE_RELS_PART, package_rels("word/document.xml"));
    package.set_string(
        "word/document.xml",
        format!(
            "{}<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body/></w:document>",
            XML_DECL
        ),
    );
}

fn excel_parts(package: &mut Package, kind: DocumentKind) {
    package.set_string(
        CONTENT_TYPES_PART,
        content_types(&[
            ("/xl/workbook.xml", kind.main_content_type()),
            (
                "/xl/worksheets/sheet1.xml",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
            ),
        ]),
    );
    package.set_string(PACKAGE_RELS_PART, package_rels("xl/workbook.xml"));
    package.set_string(
        "xl/workbook.xml",
        format!(
            "{}<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
<sheets><sheet name=\"Sheet1\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>",
            XML_DECL
        ),
    );
    package.set_string(
        "xl/_rels/workbook.xml.rels",
        relationships(&[("rId1", "worksheet", "worksheets/sheet1.xml")]),
    );
    package.set_string(
        "xl/worksheets/sheet1.xml",
        format!(
            "{}<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData/></worksheet>",
            XML_DECL
        ),
    );
}

const PML_NS: &str = "xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\"";

const EMPTY_SHAPE_TREE: &str = "<p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/><a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr></p:spTree>";

fn powerpoint_parts(package: &mut Package, kind: DocumentKind) {
    package.set_string(
        CONTENT_TYPES_PART,
        content_types(&[
            ("/ppt/presentation.xml", kind.main_content_type()),
            (
                "/ppt/slideMasters/slideMaster1.xml",
                "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
            ),
            (
                "/ppt/slideLayouts/slideLayout1.xml",
                "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
            ),
            (
                "/ppt/theme/theme1.xml",
                "application/vnd.openxmlformats-officedocument.theme+xml",
            ),
        ]),
    );
    package.set_string(PACKAGE_RELS_PART, package_rels("ppt/presentation.xml"));

    package.set_string(
        "ppt/presentation.xml",
        format!(
            "{}<p:presentation {}><p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
<p:sldSz cx=\"12192000\" cy=\"6858000\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/></p:presentation>",
            XML_DECL, PML_NS
        ),
    );
    package.set_string(
        "ppt/_rels/presentation.xml.rels",
        relationships(&[
            ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
            ("rId2", "theme", "theme/theme1.xml"),
        ]),
    );

    package.set_string(
        "ppt/slideMasters/slideMaster1.xml",
        format!(
            "{}<p:sldMaster {}><p:cSld>{}</p:cSld>\
<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" accent3=\"accent3\" \
accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>\
<p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst></p:sldMaster>",
            XML_DECL, PML_NS, EMPTY_SHAPE_TREE
        ),
    );
    package.set_string(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ]),
    );

    package.set_string(
        "ppt/slideLayouts/slideLayout1.xml",
        format!(
            "{}<p:sldLayout {} type=\"blank\" preserve=\"1\"><p:cSld name=\"Blank\">{}</p:cSld>\
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>",
            XML_DECL, PML_NS, EMPTY_SHAPE_TREE
        ),
    );
    package.set_string(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
    );

    package.set_string("ppt/theme/theme1.xml", theme_xml());
}

fn theme_xml() -> String {
    let colors = [
        ("dk1", "<a:sysClr val=\"windowText\" lastClr=\"000000\"/>"),
        ("lt1", "<a:sysClr val=\"window\" lastClr=\"FFFFFF\"/>"),
        ("dk2", "<a:srgbClr val=\"44546A\"/>"),
        ("lt2", "<a:srgbClr val=\"E7E6E6\"/>"),
        ("accent1", "<a:srgbClr val=\"4472C4\"/>"),
        ("accent2", "<a:srgbClr val=\"ED7D31\"/>"),
        ("accent3", "<a:srgbClr val=\"A5A5A5\"/>"),
        ("accent4", "<a:srgbClr val=\"FFC000\"/>"),
        ("accent5", "<a:srgbClr val=\"5B9BD5\"/>"),
        ("accent6", "<a:srgbClr val=\"70AD47\"/>"),
        ("hlink", "<a:srgbClr val=\"0563C1\"/>"),
        ("folHlink", "<a:srgbClr val=\"954F72\"/>"),
    ];
    let color_scheme: String = colors
        .iter()
        .map(|(slot, value)| format!("<a:{slot}>{value}</a:{slot}>"))
        .collect();

    let solid = "<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>";
    let line = format!("<a:ln w=\"6350\">{}</a:ln>", solid);

    format!(
        "{decl}<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office Theme\">\
<a:themeElements><a:clrScheme name=\"Office\">{colors}</a:clrScheme>\
<a:fontScheme name=\"Office\">\
<a:majorFont><a:latin typeface=\"Calibri Light\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>\
<a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>\
</a:fontScheme>\
<a:fmtScheme name=\"Office\">\
<a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst>\
<a:lnStyleLst>{line}{line}{line}</a:lnStyleLst>\
<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>\
<a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst>\
</a:fmtScheme></a:themeElements></a:theme>",
        decl = XML_DECL,
        colors = color_scheme,
        fill = solid,
        line = line,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::scan_elements;

    #[test]
    fn test_kind_ids_round_trip() {
        for kind in DocumentKind::ALL {
            assert_eq!(kind.id().parse::<DocumentKind>().unwrap(), kind);
        }
        assert_eq!(
            "WORD-DOC".parse::<DocumentKind>().unwrap(),
            DocumentKind::WordDocument
        );
    }

    #[test]
    fn test_unknown_kind() {
        let err = "word-slide".parse::<DocumentKind>().unwrap_err();
        assert!(matches!(err, PackError::UnsupportedKind(ref k) if k == "word-slide"));
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_default_stems() {
        assert_eq!(DocumentKind::ExcelMacroTemplate.default_stem(), "Book");
        assert_eq!(DocumentKind::WordTemplate.default_stem(), "Doc");
        assert_eq!(DocumentKind::WordMacroDocument.default_stem(), "Document");
        assert_eq!(DocumentKind::PowerPointTemplate.default_stem(), "Presentation");
    }

    #[test]
    fn test_every_shell_is_well_formed() {
        for kind in DocumentKind::ALL {
            let package = build_shell(kind);
            for path in package.paths() {
                let bytes = package.get(path).unwrap();
                assert!(
                    scan_elements(bytes).is_ok(),
                    "{} in {} is not well-formed",
                    path,
                    kind
                );
            }
            let types = package.get_string(CONTENT_TYPES_PART).unwrap();
            assert!(types.contains(kind.main_content_type()));
        }
    }

    #[test]
    fn test_macro_kinds_differ_only_by_content_type() {
        let plain = build_shell(DocumentKind::ExcelBook);
        let macro_enabled = build_shell(DocumentKind::ExcelMacroBook);
        assert_eq!(
            plain.paths().collect::<Vec<_>>(),
            macro_enabled.paths().collect::<Vec<_>>()
        );
        assert_eq!(plain.get("xl/workbook.xml"), macro_enabled.get("xl/workbook.xml"));
        assert!(DocumentKind::ExcelMacroBook.is_macro_enabled());
    }

    #[test]
    fn test_create_shell_writes_archive() {
        let temp = tempfile::tempdir().unwrap();
        let path = create_shell(DocumentKind::PowerPointPresentation, None, temp.path()).unwrap();
        assert_eq!(path, temp.path().join("Presentation.pptx"));

        let package = Package::open(&path).unwrap();
        assert!(package.contains("ppt/slideMasters/slideMaster1.xml"));
        assert!(package.contains("ppt/theme/theme1.xml"));

        let named = create_shell(DocumentKind::WordTemplate, Some("Letter.dotx"), temp.path()).unwrap();
        assert_eq!(named, temp.path().join("Letter.dotx"));
    }
}
