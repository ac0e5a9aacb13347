use collate_render_core::{CodecError, RenderError};
use collate_types::FrameId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("Recording could not be decoded: {0}")]
    Codec(#[from] CodecError),

    #[error("Document writer failed: {0}")]
    Render(#[from] RenderError),

    #[error("Content for frame {0} was already submitted")]
    ContentAlreadySubmitted(FrameId),

    #[error("Document accumulation error: {0}")]
    Accumulation(String),
}
