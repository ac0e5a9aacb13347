use collate_types::{Color, Rect, Size};
use std::sync::Arc;

/// A fully decoded drawing: what a frame or a page looks like once every
/// placeholder inside it has been replaced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Picture {
    pub size: Size,
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        rect: Rect,
        color: Color,
    },
    Text {
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
        text: String,
    },
    /// Another frame's content drawn into `bounds`. The nested picture is
    /// scaled from its own size to the bounds and clipped to them.
    Subframe {
        bounds: Rect,
        picture: Arc<Picture>,
    },
}

impl Picture {
    pub fn new(size: Size) -> Self {
        Self { size, ops: Vec::new() }
    }

    /// The stand-in used wherever a reference cannot be resolved.
    pub fn blank(size: Size) -> Self {
        Self::new(size)
    }

    pub fn is_blank(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push(&mut self, op: DrawOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    /// Iterates the nested pictures drawn directly by this one.
    pub fn subframes(&self) -> impl Iterator<Item = &Arc<Picture>> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Subframe { picture, .. } => Some(picture),
            _ => None,
        })
    }

    /// Counts every op in this picture and all nested pictures.
    pub fn op_count(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                DrawOp::Subframe { picture, .. } => 1 + picture.op_count(),
                _ => 1,
            })
            .sum()
    }
}
