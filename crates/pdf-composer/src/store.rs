use crate::error::ComposerError;
use collate_render_core::Picture;
use collate_types::{ContentId, FrameId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Serialized recording bytes, shared read-only once stored.
pub type SharedContent = Arc<Vec<u8>>;

/// Everything the compositor knows about one frame.
///
/// A record exists as soon as the frame has been referenced or has submitted
/// content; the content itself may arrive much later.
#[derive(Debug, Default)]
pub struct FrameRecord {
    content: Option<SharedContent>,
    declared: BTreeSet<ContentId>,
    pending: BTreeSet<ContentId>,
    ready: bool,
    unavailable: bool,
    malformed: bool,
    substituted: Option<Arc<Picture>>,
}

impl FrameRecord {
    pub fn content(&self) -> Option<&SharedContent> {
        self.content.as_ref()
    }

    /// True once the frame's content is settled: submitted, or reported
    /// unavailable.
    pub fn has_content(&self) -> bool {
        self.content.is_some() || self.unavailable
    }

    /// Ready frames stay ready for the rest of the session.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// The references declared when the content was submitted.
    pub fn declared_references(&self) -> &BTreeSet<ContentId> {
        &self.declared
    }

    /// Declared references not yet confirmed resolvable.
    pub fn pending(&self) -> &BTreeSet<ContentId> {
        &self.pending
    }

    pub fn substituted(&self) -> Option<&Arc<Picture>> {
        self.substituted.as_ref()
    }

    pub(crate) fn narrow_pending(&mut self, still_pending: BTreeSet<ContentId>) {
        debug_assert!(still_pending.is_subset(&self.pending));
        self.pending = still_pending;
    }

    pub(crate) fn mark_ready(&mut self) {
        self.pending.clear();
        self.ready = true;
    }

    pub(crate) fn mark_malformed(&mut self) {
        self.malformed = true;
    }

    pub(crate) fn set_substituted(&mut self, picture: Arc<Picture>) {
        debug_assert!(self.substituted.is_none(), "substituted content is computed once");
        self.substituted = Some(picture);
    }
}

/// Arena of frame records keyed by frame id.
#[derive(Debug, Default)]
pub struct ContentStore {
    records: HashMap<FrameId, FrameRecord>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, frame: FrameId) -> Option<&FrameRecord> {
        self.records.get(&frame)
    }

    pub(crate) fn get_mut(&mut self, frame: FrameId) -> Option<&mut FrameRecord> {
        self.records.get_mut(&frame)
    }

    pub(crate) fn ensure(&mut self, frame: FrameId) -> &mut FrameRecord {
        self.records.entry(frame).or_default()
    }

    /// Stores a frame's content. Content is immutable once stored, so a
    /// second submission for the same frame is refused.
    pub(crate) fn store_content(
        &mut self,
        frame: FrameId,
        content: SharedContent,
        references: BTreeSet<ContentId>,
    ) -> Result<(), ComposerError> {
        let record = self.ensure(frame);
        if record.has_content() {
            return Err(ComposerError::ContentAlreadySubmitted(frame));
        }
        record.content = Some(content);
        record.pending = references.clone();
        record.declared = references;
        Ok(())
    }

    /// Settles a frame that will never deliver content. Returns false if the
    /// frame already has content.
    pub(crate) fn mark_unavailable(&mut self, frame: FrameId) -> bool {
        let record = self.ensure(frame);
        if record.has_content() {
            return false;
        }
        record.unavailable = true;
        record.mark_ready();
        true
    }

    pub fn contains(&self, frame: FrameId) -> bool {
        self.records.contains_key(&frame)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
