//! PPTX (Office Open XML) extractor for slide text and presenter notes.
//!
//! Parses .pptx files which are ZIP archives containing XML documents.

pub mod parser;

pub use parser::PptxParser;

/// ZIP local file header, the first bytes of every PPTX package.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Whether a file looks like a PPTX package, by magic bytes or extension.
pub fn is_pptx(data: &[u8], filename: &str) -> bool {
    data.starts_with(&ZIP_MAGIC)
        || filename
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pptx"))
}
