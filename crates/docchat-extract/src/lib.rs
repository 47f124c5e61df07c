//! docchat-extract
//!
//! Turns uploaded bytes into plain text. The declared file type (taken from
//! the file extension) picks the strategy. Extraction never fails outright:
//! a broken document yields an empty string plus warnings, a broken page is
//! skipped. Only an unknown extension is reported as an error.

pub mod docx;
pub mod pdf;
pub mod txt;

use std::fs;
use std::path::Path;
use tracing::{info, warn};

use docchat_core::error::Result;
use docchat_core::types::FileType;

/// Extracted text plus the warnings produced along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub warnings: Vec<String>,
}

impl Extraction {
    pub(crate) fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn is_empty(&self) -> bool { self.text.is_empty() }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self { Self }

    /// Best-effort extraction for a known type. Never errors.
    pub fn extract(&self, bytes: &[u8], file_type: FileType) -> Extraction {
        match file_type {
            FileType::Pdf => pdf::extract_pdf(bytes),
            FileType::Docx => docx::extract_docx(bytes),
            FileType::Txt => txt::extract_txt(bytes),
        }
    }

    /// Extract an upload identified by its file name.
    ///
    /// Returns `Error::UnsupportedFileType` for anything other than
    /// pdf/docx/txt; the caller reports it and moves on to the next file.
    pub fn process_upload(&self, name: &str, bytes: &[u8]) -> Result<Extraction> {
        let file_type = FileType::from_file_name(name)?;
        let extraction = self.extract(bytes, file_type);
        info!(file = name, chars = extraction.text.chars().count(), warnings = extraction.warnings.len(), "extracted text");
        Ok(extraction)
    }

    pub fn process_path(&self, path: &Path) -> Result<Extraction> {
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        FileType::from_file_name(&name)?;
        let bytes = fs::read(path)?;
        self.process_upload(&name, &bytes)
    }
}
