//! Error types for deck extraction and analysis.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting or analysing a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read the input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to parse the PPTX package structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// Invalid or corrupted file.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// Required credentials or endpoint settings are missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A remote model call failed after exhausting its attempts.
    #[error(transparent)]
    GatewayError(#[from] GatewayError),

    /// An operation needs a completed deck analysis first.
    #[error("No analysis available; analyze the deck first")]
    AnalysisRequired,

    /// No deck has been loaded into the session.
    #[error("No deck loaded")]
    NoDeckLoaded,

    /// A 1-based slide number was outside the loaded deck.
    #[error("Slide {slide} does not exist (deck has {count} slides)")]
    SlideOutOfRange { slide: usize, count: usize },
}

impl Error {
    /// True for failures that mean the input could not be read as a deck.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::IoError(_)
                | Error::UnsupportedFormat(_)
                | Error::PptxParseError(_)
                | Error::CorruptedFile(_)
                | Error::ZipError(_)
                | Error::XmlError(_)
        )
    }
}

/// Failures at the remote model boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced an HTTP response.
    #[error("Model request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("Model service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Failed to decode model response: {0}")]
    InvalidResponse(String),

    /// The response decoded but carried no usable content.
    #[error("Model response contained no content")]
    EmptyResponse,

    /// The requested capability is not configured.
    #[error("Model capability unavailable: {0}")]
    Unavailable(String),
}
