use std::io::{Cursor, Write};

use docchat_core::types::FileType;
use docchat_core::Error;
use docchat_extract::docx::docx_xml_to_text;
use docchat_extract::TextExtractor;

const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn document_xml(body: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W}"><w:body>{body}</w:body></w:document>"#)
}

fn docx_bytes(xml: &str) -> Vec<u8> {
    let mut zw = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zw.start_file("word/document.xml", zip::write::FileOptions::default()).unwrap();
    zw.write_all(xml.as_bytes()).unwrap();
    zw.finish().unwrap().into_inner()
}

fn text_page(text: &str) -> Vec<lopdf::content::Operation> {
    use lopdf::content::Operation;
    use lopdf::Object;

    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 24.into()]),
        Operation::new("Td", vec![100.into(), 600.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn pdf_with_pages(pages: Vec<Vec<lopdf::content::Operation>>) -> Vec<u8> {
    use lopdf::content::Content;
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let count = pages.len() as i64;
    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn hello_pdf(pages: &[&str]) -> Vec<u8> {
    pdf_with_pages(pages.iter().map(|text| text_page(text)).collect())
}

#[test]
fn txt_utf8_is_trimmed() {
    let out = TextExtractor::new().extract("  héllo world \n".as_bytes(), FileType::Txt);
    assert_eq!(out.text, "héllo world");
    assert!(out.warnings.is_empty());
}

#[test]
fn txt_invalid_utf8_falls_back_to_latin1() {
    let bytes = b"caf\xe9 au lait \xff\xfe end";
    let out = TextExtractor::new().extract(bytes, FileType::Txt);
    assert!(!out.text.is_empty());
    assert!(out.text.starts_with("café au lait"));
    assert_eq!(out.text.chars().count(), bytes.len());
}

#[test]
fn docx_paragraphs_then_tables() {
    let body = r#"
        <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
        <w:p><w:r><w:t xml:space="preserve">   </w:t></w:r></w:p>
        <w:tbl>
          <w:tr>
            <w:tc><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc>
            <w:tc><w:p/></w:tc>
            <w:tc><w:p><w:r><w:t>Age</w:t></w:r></w:p></w:tc>
          </w:tr>
          <w:tr>
            <w:tc><w:p><w:r><w:t>Ada</w:t></w:r></w:p></w:tc>
            <w:tc><w:p><w:r><w:t>36</w:t></w:r></w:p></w:tc>
          </w:tr>
        </w:tbl>
        <w:p><w:r><w:t>Second</w:t><w:tab/><w:t>part</w:t></w:r></w:p>
    "#;
    let text = docx_xml_to_text(&document_xml(body)).unwrap();
    assert_eq!(text, "First paragraph\nSecond\tpart\nName Age \nAda 36");
}

#[test]
fn docx_archive_is_read_through_extractor() {
    let xml = document_xml("<w:p><w:r><w:t>Inside a real archive</w:t></w:r></w:p>");
    let out = TextExtractor::new().process_upload("memo.DOCX", &docx_bytes(&xml)).unwrap();
    assert_eq!(out.text, "Inside a real archive");
}

#[test]
fn broken_docx_returns_empty_with_warning() {
    let out = TextExtractor::new().extract(b"not a zip archive", FileType::Docx);
    assert!(out.is_empty());
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].starts_with("Error reading DOCX"));
}

#[test]
fn pdf_pages_are_delimited() {
    let bytes = hello_pdf(&["Hello page one", "Hello page two"]);
    let out = TextExtractor::new().extract(&bytes, FileType::Pdf);
    assert!(out.text.starts_with("--- Page 1 ---"), "got {:?}", out.text);
    assert!(out.text.contains("--- Page 2 ---"));
    assert!(out.text.contains("Hello page one"));
    assert!(out.text.contains("Hello page two"));
}

#[test]
fn unreadable_pdf_page_is_skipped_with_warning() {
    use lopdf::content::Operation;

    // `Tf` needs a font name; a number makes text extraction fail for that page.
    let broken = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![7.into(), 24.into()]),
        Operation::new("ET", vec![]),
    ];
    let bytes = pdf_with_pages(vec![text_page("Readable first page"), broken]);
    let out = TextExtractor::new().extract(&bytes, FileType::Pdf);

    assert!(out.text.starts_with("--- Page 1 ---"), "got {:?}", out.text);
    assert!(out.text.contains("Readable first page"));
    assert!(!out.text.contains("--- Page 2 ---"));
    assert_eq!(out.warnings.len(), 1, "{:?}", out.warnings);
    assert!(out.warnings[0].starts_with("Could not extract text from page 2"), "{:?}", out.warnings);
}

#[test]
fn broken_pdf_returns_empty_with_warning() {
    let out = TextExtractor::new().extract(b"%PDF-1.4 garbage", FileType::Pdf);
    assert!(out.is_empty());
    assert!(out.warnings[0].starts_with("Error reading PDF"));
}

#[test]
fn unsupported_upload_is_an_error() {
    match TextExtractor::new().process_upload("image.png", b"\x89PNG") {
        Err(Error::UnsupportedFileType(ext)) => assert_eq!(ext, "png"),
        other => panic!("expected unsupported type, got {other:?}"),
    }
}

#[test]
fn process_path_reads_from_disk() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("doc.txt");
    std::fs::write(&path, "from disk").unwrap();
    let out = TextExtractor::new().process_path(&path).unwrap();
    assert_eq!(out.text, "from disk");
}
