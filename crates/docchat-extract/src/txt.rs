use tracing::debug;

use crate::Extraction;

/// Decode as UTF-8, falling back to Latin-1 which maps every byte to a char.
pub fn extract_txt(bytes: &[u8]) -> Extraction {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.trim().to_string(),
        Err(e) => {
            debug!(error = %e, "not valid UTF-8, decoding as Latin-1");
            decode_latin1(bytes).trim().to_string()
        }
    };
    Extraction { text, warnings: Vec::new() }
}

pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
