//! PDF document writer for composed pictures, built on lopdf.
//!
//! Composed pages are flattened into content streams (nested subframes become
//! clipped groups) and written with a buffered writer that emits objects in
//! id order, so identical compositions give identical bytes.

mod helpers;
mod renderer;
mod writer;

pub use helpers::{render_picture_to_content, BODY_FONT};
pub use renderer::LopdfDocumentWriter;
pub use writer::BufferedPdfWriter;
