use crate::readiness::MissingReference;
use crate::store::SharedContent;
use collate_types::{ContentId, FrameId};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Outcome reported to a composition callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionStatus {
    Success,
    /// The request's own content could not be decoded, or has no pages.
    ContentFormatError,
    /// Composed, but one or more nested references were drawn blank.
    PartialContent,
    /// The document writer failed. No bytes are delivered.
    CompositingFailure,
}

impl CompositionStatus {
    /// True for statuses that come with document bytes.
    pub fn has_output(self) -> bool {
        matches!(self, Self::Success | Self::PartialContent)
    }
}

impl fmt::Display for CompositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::ContentFormatError => "content format error",
            Self::PartialContent => "partial content",
            Self::CompositingFailure => "compositing failure",
        };
        f.write_str(name)
    }
}

pub type CompositionCallback = Box<dyn FnOnce(CompositionStatus, Vec<u8>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionTarget {
    /// One page, composed from the first page of the request content.
    Page(u32),
    /// Every page of the request content.
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

pub(crate) enum RequestState {
    Waiting(CompositionCallback),
    Fulfilled,
}

/// A composition request that could not be satisfied when it arrived.
pub(crate) struct PendingRequest {
    pub id: RequestId,
    pub root: FrameId,
    pub target: CompositionTarget,
    pub content: SharedContent,
    pub references: BTreeSet<ContentId>,
    pub unsatisfied: BTreeSet<MissingReference>,
    /// Frames whose state the last readiness check depended on.
    pub watched: HashSet<FrameId>,
    state: RequestState,
}

impl PendingRequest {
    pub fn new(
        id: RequestId,
        root: FrameId,
        target: CompositionTarget,
        content: SharedContent,
        references: BTreeSet<ContentId>,
        callback: CompositionCallback,
    ) -> Self {
        Self {
            id,
            root,
            target,
            content,
            references,
            unsatisfied: BTreeSet::new(),
            watched: HashSet::new(),
            state: RequestState::Waiting(callback),
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.state, RequestState::Waiting(_))
    }

    pub fn is_blocked_by(&self, touched: &HashSet<FrameId>) -> bool {
        self.unsatisfied
            .iter()
            .any(|missing| touched.contains(&missing.owner) || touched.contains(&missing.blocked_on))
            || !self.watched.is_disjoint(touched)
    }

    /// Moves the request to `Fulfilled` and hands out its callback. The
    /// state changes before the callback can run, so a request is never
    /// fulfilled twice.
    pub fn finish(&mut self) -> Option<CompositionCallback> {
        match std::mem::replace(&mut self.state, RequestState::Fulfilled) {
            RequestState::Waiting(callback) => Some(callback),
            RequestState::Fulfilled => None,
        }
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("target", &self.target)
            .field("references", &self.references)
            .field("unsatisfied", &self.unsatisfied)
            .field("waiting", &self.is_waiting())
            .finish()
    }
}
