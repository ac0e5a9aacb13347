pub mod color;
pub mod geometry;
pub mod ids;

pub use color::Color;
pub use geometry::{Rect, Size};
pub use ids::{ContentId, FrameId};
