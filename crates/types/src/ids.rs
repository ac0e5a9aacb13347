//! Newtype wrappers for frame and content identifiers
//!
//! A `FrameId` names one independently rendered frame for the whole session.
//! A `ContentId` only means something inside the content of the frame that
//! recorded it, so the pair `(FrameId, ContentId)` is what identifies a
//! cross-frame reference.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A globally unique identifier for one frame's rendering context.
///
/// Ids produced by the transport pack the renderer process id into the high
/// 32 bits and the frame's routing id into the low 32 bits.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    /// Creates a FrameId from its raw 64-bit value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Builds the id of frame `routing_id` hosted in renderer `process_id`
    pub const fn from_parts(process_id: u32, routing_id: u32) -> Self {
        Self(((process_id as u64) << 32) | routing_id as u64)
    }

    /// Returns the raw 64-bit value
    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn process_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn routing_id(self) -> u32 {
        self.0 as u32
    }
}

impl From<u64> for FrameId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.process_id(), self.routing_id())
    }
}

/// Labels a placeholder inside one frame's content that stands for the
/// content of some other frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(u32);

impl ContentId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ContentId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
