use lopdf::Document;

use docchat_core::types::FileType;
use docchat_core::Error;

use crate::Extraction;

/// Page-by-page PDF text. Each page with text is wrapped as
/// `\n--- Page N ---\n<text>\n`; a page that fails is reported and skipped.
pub fn extract_pdf(bytes: &[u8]) -> Extraction {
    let mut out = Extraction::default();
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            out.warn(Error::Extraction { file_type: FileType::Pdf, message: e.to_string() }.to_string());
            return out;
        }
    };

    let mut text = String::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) if !page_text.trim().is_empty() => {
                text.push_str(&format!("\n--- Page {} ---\n{}\n", page_num, page_text));
            }
            Ok(_) => {}
            Err(e) => out.warn(format!("Could not extract text from page {}: {}", page_num, e)),
        }
    }
    out.text = text.trim().to_string();
    out
}
