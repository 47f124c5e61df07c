use roxmltree::Node;
use std::io::{Cursor, Read};

use docchat_core::types::FileType;
use docchat_core::Error;

use crate::Extraction;

const DOCUMENT_PART: &str = "word/document.xml";

/// Body paragraphs (empty ones skipped, one per line) followed by table text:
/// non-empty cells joined by spaces, one row per line.
pub fn extract_docx(bytes: &[u8]) -> Extraction {
    let mut out = Extraction::default();
    match read_document_xml(bytes).and_then(|xml| docx_xml_to_text(&xml)) {
        Ok(text) => out.text = text,
        Err(message) => out.warn(Error::Extraction { file_type: FileType::Docx, message }.to_string()),
    }
    out
}

fn read_document_xml(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let mut part = archive.by_name(DOCUMENT_PART).map_err(|e| format!("{}: {}", DOCUMENT_PART, e))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(|e| e.to_string())?;
    Ok(xml)
}

/// Plain text of a WordprocessingML `document.xml` part.
pub fn docx_xml_to_text(xml: &str) -> Result<String, String> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| e.to_string())?;
    let body = doc
        .descendants()
        .find(|n| is_w(n, "body"))
        .ok_or_else(|| "document has no body".to_string())?;

    let mut text = String::new();
    for p in body.children().filter(|n| is_w(n, "p")) {
        let para = paragraph_text(&p);
        if !para.trim().is_empty() {
            text.push_str(&para);
            text.push('\n');
        }
    }
    for table in body.children().filter(|n| is_w(n, "tbl")) {
        for row in table.children().filter(|n| is_w(n, "tr")) {
            for cell in row.children().filter(|n| is_w(n, "tc")) {
                let cell_text = cell
                    .children()
                    .filter(|n| is_w(n, "p"))
                    .map(|p| paragraph_text(&p))
                    .collect::<Vec<_>>()
                    .join("\n");
                if !cell_text.trim().is_empty() {
                    text.push_str(&cell_text);
                    text.push(' ');
                }
            }
            text.push('\n');
        }
    }
    Ok(text.trim().to_string())
}

fn paragraph_text(p: &Node) -> String {
    let mut s = String::new();
    for n in p.descendants().filter(|n| n.is_element()) {
        match n.tag_name().name() {
            "t" => s.push_str(n.text().unwrap_or_default()),
            "tab" => s.push('\t'),
            "br" | "cr" => s.push('\n'),
            _ => {}
        }
    }
    s
}

fn is_w(node: &Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local
}
