//! The serialized recording format and the codec that moves between
//! recordings and [`Picture`]s.
//!
//! A recording is what a renderer captures for a frame or a page. Content
//! belonging to another frame is not recorded; a `placeholder` op with a
//! [`ContentId`] is written in its place and filled in at decode time through
//! the lookup hook.

use crate::error::CodecError;
use crate::picture::{DrawOp, Picture};
use collate_types::{Color, ContentId, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Decodes recordings into pictures and encodes pictures into recordings.
pub trait PictureCodec: Send + Sync + fmt::Debug {
    /// Decodes every page of `bytes`.
    ///
    /// `lookup` is called once per placeholder, in document order, and its
    /// result is drawn where the placeholder was.
    fn decode(
        &self,
        bytes: &[u8],
        lookup: &mut dyn FnMut(ContentId) -> Arc<Picture>,
    ) -> Result<Vec<Picture>, CodecError>;

    /// Encodes `pages`. Every [`DrawOp::Subframe`] becomes a placeholder whose
    /// id is chosen by `assign`; a `decode` whose lookup maps those ids back
    /// to the same pictures reproduces `pages`.
    fn encode(
        &self,
        pages: &[Picture],
        assign: &mut dyn FnMut(&Arc<Picture>) -> ContentId,
    ) -> Result<Vec<u8>, CodecError>;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub pages: Vec<RecordedPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPage {
    #[serde(default = "Size::letter")]
    pub size: Size,
    #[serde(default)]
    pub ops: Vec<RecordedOp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RecordedOp {
    FillRect {
        rect: Rect,
        color: Color,
    },
    Text {
        x: f32,
        y: f32,
        font_size: f32,
        #[serde(default)]
        color: Color,
        text: String,
    },
    Placeholder {
        content_id: ContentId,
        bounds: Rect,
    },
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new page; the drawing helpers below append to it.
    pub fn page(mut self, size: Size) -> Self {
        self.pages.push(RecordedPage { size, ops: Vec::new() });
        self
    }

    pub fn fill_rect(self, rect: Rect, color: Color) -> Self {
        self.with_op(RecordedOp::FillRect { rect, color })
    }

    pub fn text(self, x: f32, y: f32, font_size: f32, text: impl Into<String>) -> Self {
        self.with_op(RecordedOp::Text { x, y, font_size, color: Color::default(), text: text.into() })
    }

    pub fn placeholder(self, content_id: ContentId, bounds: Rect) -> Self {
        self.with_op(RecordedOp::Placeholder { content_id, bounds })
    }

    fn with_op(mut self, op: RecordedOp) -> Self {
        if self.pages.is_empty() {
            self.pages.push(RecordedPage { size: Size::letter(), ops: Vec::new() });
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
        self
    }

    /// Every content id referenced by a placeholder on any page.
    pub fn placeholder_ids(&self) -> BTreeSet<ContentId> {
        self.pages
            .iter()
            .flat_map(|page| page.ops.iter())
            .filter_map(|op| match op {
                RecordedOp::Placeholder { content_id, .. } => Some(*content_id),
                _ => None,
            })
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The default codec: recordings are JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPictureCodec;

impl PictureCodec for JsonPictureCodec {
    fn decode(
        &self,
        bytes: &[u8],
        lookup: &mut dyn FnMut(ContentId) -> Arc<Picture>,
    ) -> Result<Vec<Picture>, CodecError> {
        let recording = Recording::from_bytes(bytes)?;
        if recording.pages.is_empty() {
            return Err(CodecError::Empty);
        }

        let pages = recording
            .pages
            .into_iter()
            .map(|page| {
                let ops = page
                    .ops
                    .into_iter()
                    .map(|op| match op {
                        RecordedOp::FillRect { rect, color } => DrawOp::FillRect { rect, color },
                        RecordedOp::Text { x, y, font_size, color, text } => {
                            DrawOp::Text { x, y, font_size, color, text }
                        }
                        RecordedOp::Placeholder { content_id, bounds } => {
                            DrawOp::Subframe { bounds, picture: lookup(content_id) }
                        }
                    })
                    .collect();
                Picture { size: page.size, ops }
            })
            .collect();
        Ok(pages)
    }

    fn encode(
        &self,
        pages: &[Picture],
        assign: &mut dyn FnMut(&Arc<Picture>) -> ContentId,
    ) -> Result<Vec<u8>, CodecError> {
        let recording = Recording {
            pages: pages
                .iter()
                .map(|page| RecordedPage {
                    size: page.size,
                    ops: page
                        .ops
                        .iter()
                        .map(|op| match op {
                            DrawOp::FillRect { rect, color } => {
                                RecordedOp::FillRect { rect: *rect, color: color.clone() }
                            }
                            DrawOp::Text { x, y, font_size, color, text } => RecordedOp::Text {
                                x: *x,
                                y: *y,
                                font_size: *font_size,
                                color: color.clone(),
                                text: text.clone(),
                            },
                            DrawOp::Subframe { bounds, picture } => {
                                RecordedOp::Placeholder { content_id: assign(picture), bounds: *bounds }
                            }
                        })
                        .collect(),
                })
                .collect(),
        };
        recording.to_bytes()
    }
}
