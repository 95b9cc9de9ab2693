use crate::decode::Rect;
use thiserror::Error;

/// Errors that end a scan early
#[derive(Error, Debug)]
pub enum ScanError {
    /// A detection payload was not valid UTF-8 and the policy is `abort`
    #[error("QR payload at {rect} is not valid UTF-8 ({len} bytes)")]
    InvalidPayload {
        rect: Rect,
        len: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("QR decoding failed: {0:#}")]
    Decode(anyhow::Error),

    #[error("Failed to present frame: {0:#}")]
    Display(anyhow::Error),

    #[error("Failed to write to console: {0:#}")]
    Sink(anyhow::Error),

    #[error("Failed to read font file {path}")]
    FontIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse font {path}")]
    FontParse {
        path: String,
        #[source]
        source: ab_glyph::InvalidFont,
    },
}
