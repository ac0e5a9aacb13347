//! Composes independently recorded frames into PDF documents.
//!
//! A page made of several frames (the main document plus embedded
//! subframes) is recorded frame by frame. Content belonging to another
//! frame is recorded as a placeholder, and the frame recordings reach the
//! compositor in whatever order the renderers finish. This crate runs a
//! [`Compositor`] per job as a tokio task and exposes it through a
//! cloneable [`SessionHandle`]:
//!
//! ```no_run
//! use collate::{FrameId, Recording, SessionBuilder, ContentId, Rect};
//!
//! # async fn run() -> Result<(), collate::SessionError> {
//! let session = SessionBuilder::new().build();
//! let handle = session.handle();
//!
//! let page = Recording::new().placeholder(ContentId::new(1), Rect::new(0.0, 0.0, 300.0, 200.0));
//! let pending = handle
//!     .compose_document(FrameId::new(1), page.to_bytes().unwrap(), [ContentId::new(1)])
//!     .await?;
//!
//! handle.register_reference(FrameId::new(1), ContentId::new(1), FrameId::new(2)).await?;
//! let embedded = Recording::new().text(10.0, 10.0, 12.0, "embedded");
//! handle.submit_content(FrameId::new(2), embedded.to_bytes().unwrap(), Vec::<ContentId>::new()).await?;
//!
//! let composed = pending.wait().await?;
//! assert!(composed.has_output());
//! session.shutdown().await
//! # }
//! ```

mod config;
mod error;
pub mod manifest;
pub mod session;

pub use config::SessionConfig;
pub use error::SessionError;
pub use manifest::{JobEvent, JobManifest, ReplayOutcome};
pub use session::{Composed, PendingComposition, Session, SessionBuilder, SessionHandle, SessionStatus};

pub use collate_pdf_composer::{
    ComposerError, CompositionStatus, CompositionTarget, Compositor, CompositorOptions, ConflictPolicy,
    MissingReference,
};
pub use collate_render_core::{DocumentInfo, DocumentWriter, JsonPictureCodec, Picture, PictureCodec, Recording};
pub use collate_render_lopdf::LopdfDocumentWriter;
pub use collate_types::{Color, ContentId, FrameId, Rect, Size};
