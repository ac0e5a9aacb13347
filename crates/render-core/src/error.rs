use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF generation error: {0}")]
    Pdf(String),
    #[error("Document has no pages")]
    NoPages,
    #[error("Other rendering error: {0}")]
    Other(String),
}

impl From<&str> for RenderError {
    fn from(s: &str) -> Self {
        RenderError::Other(s.to_string())
    }
}

/// Failures turning recording bytes into pictures or back.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed recording: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Recording contains no pages")]
    Empty,
    #[error("Failed to encode recording: {0}")]
    Encode(String),
}
