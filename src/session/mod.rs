//! A composition session running as its own task.
//!
//! The [`Compositor`](collate_pdf_composer::Compositor) is single-owner state,
//! so a session gives it to one tokio task and talks to it over a command
//! channel:
//!
//! ```text
//! SessionHandle (N) -> async-channel -> session task -> Compositor
//!        ^                                                  |
//!        +---------------- oneshot per request -------------+
//! ```
//!
//! Commands are applied in the order they are received. A composition
//! command answers with a [`PendingComposition`] that resolves whenever the
//! compositor fulfills the request, which may be long after the command was
//! applied. If the session times out, the compositor is discarded with all
//! of its waiting requests, and their futures resolve to
//! [`SessionError::Expired`](crate::SessionError::Expired).

mod builder;
mod handle;
mod service;

pub use builder::{Session, SessionBuilder};
pub use handle::{Composed, PendingComposition, SessionHandle, SessionStatus};
