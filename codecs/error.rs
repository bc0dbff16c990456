use thiserror::Error;

/// Failure to produce a preview for a single entry.
///
/// Decode errors are scoped to one item and never abort a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Every registered image decoder rejected the bytes.
    /// `decoder` and `message` describe the last attempt.
    #[error("no image decoder accepted the data (last tried {decoder}: {message})")]
    CodecFailure {
        decoder: &'static str,
        message: String,
    },

    #[error("text decode failed: {0}")]
    TextDecodeFailure(String),

    #[error("xml parse failed: {0}")]
    XmlParseFailure(String),
}

impl DecodeError {
    /// Short machine-friendly tag, used in logs and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::CodecFailure { .. } => "codec",
            DecodeError::TextDecodeFailure(_) => "text",
            DecodeError::XmlParseFailure(_) => "xml",
        }
    }
}
