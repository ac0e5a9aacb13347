// src/error.rs
use collate_pdf_composer::ComposerError;
use thiserror::Error;

/// Errors surfaced by a composition session and its front ends.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The session is closed")]
    Closed,

    #[error("The session timed out before the request could be composed")]
    Expired,

    #[error("The session ended before the request was composed")]
    Dropped,

    #[error("Composer error: {0}")]
    Composer(#[from] ComposerError),

    #[error("Session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
