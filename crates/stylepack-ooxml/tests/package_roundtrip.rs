//! Pack/unpack round trips through the filesystem

use std::fs;
use std::path::Path;

use stylepack_ooxml::test_utils::{create_docx_with_styles, write_docx};
use stylepack_ooxml::{
    create_shell, pack, unpack, validate_package, ConventionNaming, DocumentKind, Package,
    PackSettings,
};

fn write_file(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn policy() -> ConventionNaming {
    ConventionNaming::new(PackSettings::default())
}

#[test]
fn test_directory_survives_pack_and_unpack() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("expanded");
    let files: Vec<(&str, Vec<u8>)> = vec![
        ("[Content_Types].xml", b"<Types/>".to_vec()),
        ("_rels/.rels", b"<Relationships/>".to_vec()),
        ("word/document.xml", "<w:document>caf\u{e9}</w:document>".as_bytes().to_vec()),
        ("word/media/Image1.PNG", vec![0x89, 0x50, 0x4e, 0x47, 0, 1, 2, 255]),
        ("customXml/item1.xml", b"<a/>".to_vec()),
    ];
    for (path, contents) in &files {
        write_file(&source, path, contents);
    }

    let archive = temp.path().join("doc.docx");
    pack(&source, Some(&archive), &policy()).unwrap();
    let unpacked = unpack(&archive, None).unwrap();

    assert_eq!(unpacked.entries, files.len());
    for (path, contents) in &files {
        assert_eq!(&fs::read(unpacked.dest.join(path)).unwrap(), contents, "{}", path);
    }
}

#[test]
fn test_archive_survives_unpack_and_pack() {
    let temp = tempfile::tempdir().unwrap();
    let original = write_docx(temp.path(), "t.docx", &create_docx_with_styles(&["A", "B"]));

    let unpacked = unpack(&original, None).unwrap();
    let repacked = temp.path().join("again.docx");
    pack(&unpacked.dest, Some(&repacked), &policy()).unwrap();

    let before = Package::open(&original).unwrap();
    let after = Package::open(&repacked).unwrap();
    assert_eq!(
        before.paths().collect::<Vec<_>>(),
        after.paths().collect::<Vec<_>>()
    );
    for path in before.paths() {
        assert_eq!(before.get(path), after.get(path), "{}", path);
    }
}

#[test]
fn test_repeated_unpack_never_touches_existing_directory() {
    let temp = tempfile::tempdir().unwrap();
    let archive = write_docx(temp.path(), "t.docx", &create_docx_with_styles(&["A"]));

    let first = unpack(&archive, None).unwrap();
    fs::write(first.dest.join("word/styles.xml"), "edited").unwrap();

    let second = unpack(&archive, None).unwrap();
    assert_ne!(first.dest, second.dest);
    assert!(second
        .dest
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("t_expanded_"));
    assert_eq!(
        fs::read_to_string(first.dest.join("word/styles.xml")).unwrap(),
        "edited"
    );
}

#[test]
fn test_explicit_unpack_destination() {
    let temp = tempfile::tempdir().unwrap();
    let archive = write_docx(temp.path(), "t.docx", &create_docx_with_styles(&["A"]));
    let dest = temp.path().join("nested/out");

    let outcome = unpack(&archive, Some(&dest)).unwrap();
    assert_eq!(outcome.dest, dest);
    assert!(dest.join("word/styles.xml").is_file());
}

#[test]
fn test_created_shells_validate_after_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    for kind in [
        DocumentKind::WordMacroTemplate,
        DocumentKind::ExcelTemplate,
        DocumentKind::PowerPointPresentation,
    ] {
        let path = create_shell(kind, None, temp.path()).unwrap();
        let unpacked = unpack(&path, None).unwrap();
        let package = Package::open(&unpacked.dest).unwrap();
        let report = validate_package(&package);
        assert!(!report.has_errors(), "{}: {}", kind, report.to_text());
    }
}
