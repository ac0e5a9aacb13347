//! Core rendering abstractions for composing frame content into documents.
//!
//! This crate provides the types shared by the compositor and the document
//! backends:
//! - `Picture` / `DrawOp`: decoded drawing content, possibly nesting other frames
//! - `PictureCodec` and the JSON `Recording` format frames are captured in
//! - `DocumentWriter` trait for turning composed pages into document bytes
//! - Error types for codecs and writers

pub mod codec;
mod error;
mod picture;
mod traits;
pub mod utils;

pub use codec::{JsonPictureCodec, PictureCodec, RecordedOp, RecordedPage, Recording};
pub use error::{CodecError, RenderError};
pub use picture::{DrawOp, Picture};
pub use traits::{DocumentInfo, DocumentWriter};
