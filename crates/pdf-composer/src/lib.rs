//! Dependency tracking and recursive composition of multi-frame content.
//!
//! Each frame of a document is recorded on its own. Where one frame embeds
//! another, its recording carries a placeholder [`ContentId`] instead of the
//! embedded drawing. The [`Compositor`] collects recordings and placeholder
//! registrations as they arrive, in any order, and:
//! - tracks which frames are ready (their content and everything it embeds
//!   is available), treating cycles between frames as satisfied
//! - queues composition requests until their references are ready, then
//!   fulfills each exactly once
//! - substitutes frame content into placeholders recursively, memoizing each
//!   frame's result, and hands the pages to a [`DocumentWriter`]
//!
//! [`ContentId`]: collate_types::ContentId
//! [`DocumentWriter`]: collate_render_core::DocumentWriter

mod accumulator;
mod compositor;
mod error;
mod graph;
mod readiness;
mod request;
mod store;
mod substitute;

pub use compositor::{Compositor, CompositorOptions};
pub use error::ComposerError;
pub use graph::{ConflictPolicy, DependencyGraph, Registration};
pub use readiness::{MissingReference, Readiness, ReadinessChecker};
pub use request::{CompositionCallback, CompositionStatus, CompositionTarget, RequestId};
pub use store::{ContentStore, FrameRecord, SharedContent};
pub use substitute::{BlankReason, BlankedReference, SubstitutionReport};
