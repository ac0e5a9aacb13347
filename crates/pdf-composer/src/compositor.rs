use crate::accumulator::{CompletedDocument, DocumentAccumulator};
use crate::error::ComposerError;
use crate::graph::{ConflictPolicy, DependencyGraph, Registration};
use crate::readiness::{MissingReference, ReadinessChecker};
use crate::request::{
    CompositionCallback, CompositionStatus, CompositionTarget, PendingRequest, RequestId,
};
use crate::store::{ContentStore, FrameRecord, SharedContent};
use crate::substitute::Substituter;
use collate_render_core::{DocumentInfo, DocumentWriter, Picture, PictureCodec};
use collate_types::{ContentId, FrameId};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

/// Per-session settings for a [`Compositor`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompositorOptions {
    pub conflict_policy: ConflictPolicy,
    pub document_info: DocumentInfo,
}

enum Refresh {
    Unchanged,
    Narrowed,
    BecameReady,
}

/// Tracks frame content and the references between frames, and turns
/// composition requests into documents once everything they depend on has
/// arrived.
///
/// One compositor serves one composition session. All methods take
/// `&mut self`; callers serialize access, and callbacks run on the calling
/// thread either before the request method returns or during a later
/// `register_reference`, `submit_content` or `notify_unavailable_frame`.
pub struct Compositor {
    store: ContentStore,
    graph: DependencyGraph,
    codec: Arc<dyn PictureCodec>,
    writer: Arc<dyn DocumentWriter>,
    options: CompositorOptions,
    root_frame: Option<FrameId>,
    requests: Vec<PendingRequest>,
    next_request_id: u64,
    accumulator: Option<DocumentAccumulator>,
}

impl Compositor {
    pub fn new(codec: Arc<dyn PictureCodec>, writer: Arc<dyn DocumentWriter>) -> Self {
        Self {
            store: ContentStore::new(),
            graph: DependencyGraph::new(),
            codec,
            writer,
            options: CompositorOptions::default(),
            root_frame: None,
            requests: Vec::new(),
            next_request_id: 1,
            accumulator: None,
        }
    }

    pub fn with_options(mut self, options: CompositorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn set_document_info(&mut self, info: DocumentInfo) {
        self.options.document_info = info;
    }

    /// Records that placeholder `content_id` in `owner`'s content is drawn
    /// with `target`'s content.
    pub fn register_reference(&mut self, owner: FrameId, content_id: ContentId, target: FrameId) {
        self.store.ensure(owner);
        self.store.ensure(target);

        match self.graph.register(owner, content_id, target, self.options.conflict_policy) {
            Registration::Unchanged => return,
            Registration::Inserted => {
                debug!("[COMPOSITOR] Registered {} {} -> {}", owner, content_id, target);
            }
            Registration::Replaced { previous } => {
                warn!(
                    "[COMPOSITOR] Conflicting registration for {} {}: {} replaces {}",
                    owner, content_id, target, previous
                );
            }
            Registration::Kept { existing } => {
                warn!(
                    "[COMPOSITOR] Conflicting registration for {} {}: keeping {}, ignoring {}",
                    owner, content_id, existing, target
                );
                return;
            }
        }

        self.propagate([owner]);
    }

    /// Stores a frame's recording along with the placeholder ids it contains.
    ///
    /// Content is immutable once stored; a second submission for the same
    /// frame is refused and leaves the first one in place.
    pub fn submit_content<C, R>(&mut self, frame: FrameId, content: C, references: R) -> Result<(), ComposerError>
    where
        C: Into<SharedContent>,
        R: IntoIterator<Item = ContentId>,
    {
        let references: BTreeSet<ContentId> = references.into_iter().collect();
        debug!("[COMPOSITOR] Content for frame {} with {} references.", frame, references.len());
        if let Err(err) = self.store.store_content(frame, content.into(), references) {
            warn!("[COMPOSITOR] {}", err);
            return Err(err);
        }
        self.propagate([frame]);
        Ok(())
    }

    /// Records that `frame` will never deliver content. Everything waiting
    /// on it proceeds with a blank in its place.
    pub fn notify_unavailable_frame(&mut self, frame: FrameId) {
        if !self.store.mark_unavailable(frame) {
            debug!("[COMPOSITOR] Frame {} already has content, ignoring unavailability.", frame);
            return;
        }
        info!("[COMPOSITOR] Frame {} is unavailable.", frame);
        let mut seeds = vec![frame];
        seeds.extend(self.graph.dependent_frames(frame));
        self.propagate(seeds);
    }

    /// Composes a single page. `content` is the page's recording; its first
    /// page is used.
    pub fn request_page_composition<C, R, F>(
        &mut self,
        root: FrameId,
        page_number: u32,
        content: C,
        references: R,
        on_done: F,
    ) -> RequestId
    where
        C: Into<SharedContent>,
        R: IntoIterator<Item = ContentId>,
        F: FnOnce(CompositionStatus, Vec<u8>) + Send + 'static,
    {
        self.request(root, CompositionTarget::Page(page_number), content.into(), references, Box::new(on_done))
    }

    /// Composes every page of `content` into one document.
    pub fn request_document_composition<C, R, F>(
        &mut self,
        root: FrameId,
        content: C,
        references: R,
        on_done: F,
    ) -> RequestId
    where
        C: Into<SharedContent>,
        R: IntoIterator<Item = ContentId>,
        F: FnOnce(CompositionStatus, Vec<u8>) + Send + 'static,
    {
        self.request(root, CompositionTarget::Document, content.into(), references, Box::new(on_done))
    }

    /// Starts collecting composed pages for [`Compositor::complete_document`].
    pub fn prepare_for_document(&mut self) -> Result<(), ComposerError> {
        if self.accumulator.is_some() {
            return Err(ComposerError::Accumulation("already preparing a document".into()));
        }
        self.accumulator = Some(DocumentAccumulator::new());
        Ok(())
    }

    /// Writes the collected pages as one document once `page_count` pages
    /// have been composed.
    pub fn complete_document<F>(&mut self, page_count: u32, on_done: F) -> Result<(), ComposerError>
    where
        F: FnOnce(CompositionStatus, Vec<u8>) + Send + 'static,
    {
        let accumulator = self
            .accumulator
            .as_mut()
            .ok_or_else(|| ComposerError::Accumulation("prepare_for_document was not called".into()))?;
        if page_count == 0 {
            warn!("[COMPOSITOR] Document completion requested with zero pages.");
            self.accumulator = None;
            on_done(CompositionStatus::ContentFormatError, Vec::new());
            return Ok(());
        }
        accumulator.set_completion(page_count, Box::new(on_done))?;
        debug!("[COMPOSITOR] Document expects {} pages, {} collected.", page_count, accumulator.collected());
        self.try_complete_document();
        Ok(())
    }

    pub fn is_frame_ready(&self, frame: FrameId) -> bool {
        self.store.get(frame).is_some_and(FrameRecord::is_ready)
    }

    pub fn frame(&self, frame: FrameId) -> Option<&FrameRecord> {
        self.store.get(frame)
    }

    /// What still keeps `frame` from becoming ready. Empty for ready frames
    /// and for frames without content.
    pub fn missing_for(&self, frame: FrameId) -> Vec<MissingReference> {
        match self.store.get(frame) {
            Some(record) if record.has_content() && !record.is_ready() => {
                let pending: Vec<ContentId> = record.pending().iter().copied().collect();
                self.checker().check(frame, pending).missing.into_iter().collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn pending_request_count(&self) -> usize {
        self.requests.len()
    }

    pub fn root_frame(&self) -> Option<FrameId> {
        self.root_frame
    }

    fn checker(&self) -> ReadinessChecker<'_> {
        ReadinessChecker::new(&self.store, &self.graph)
    }

    fn request<R>(
        &mut self,
        root: FrameId,
        target: CompositionTarget,
        content: SharedContent,
        references: R,
        callback: CompositionCallback,
    ) -> RequestId
    where
        R: IntoIterator<Item = ContentId>,
    {
        if self.root_frame.is_none() {
            self.root_frame = Some(root);
        }
        self.store.ensure(root);

        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;

        let references: BTreeSet<ContentId> = references.into_iter().collect();
        let mut pending = PendingRequest::new(id, root, target, content, references, callback);
        let readiness = self.checker().check(root, pending.references.iter().copied());
        if readiness.is_ready() {
            self.fulfill(pending);
        } else {
            debug!(
                "[COMPOSITOR] {} for frame {} waits on {} references.",
                id,
                root,
                readiness.missing.len()
            );
            pending.unsatisfied = readiness.missing;
            pending.watched = readiness.visited;
            self.requests.push(pending);
        }
        id
    }

    /// Re-evaluates the seed frames and cascades through the reverse index
    /// to every frame that becomes ready as a result, then services the
    /// requests that depend on anything that changed.
    fn propagate<I>(&mut self, seeds: I)
    where
        I: IntoIterator<Item = FrameId>,
    {
        let mut queue: VecDeque<FrameId> = seeds.into_iter().collect();
        let mut touched: HashSet<FrameId> = queue.iter().copied().collect();

        while let Some(frame) = queue.pop_front() {
            match self.refresh_frame(frame) {
                Refresh::BecameReady => {
                    debug!("[COMPOSITOR] Frame {} is ready.", frame);
                    touched.insert(frame);
                    queue.extend(self.graph.dependent_frames(frame));
                }
                Refresh::Narrowed => {
                    touched.insert(frame);
                }
                Refresh::Unchanged => {}
            }
        }

        self.service_requests(&touched);
    }

    fn refresh_frame(&mut self, frame: FrameId) -> Refresh {
        let pending = match self.store.get(frame) {
            Some(record) if record.has_content() && !record.is_ready() => record.pending().clone(),
            _ => return Refresh::Unchanged,
        };

        let unresolved = self.checker().unresolved(frame, pending.iter().copied());
        let Some(record) = self.store.get_mut(frame) else {
            return Refresh::Unchanged;
        };
        if unresolved.is_empty() {
            record.mark_ready();
            Refresh::BecameReady
        } else if unresolved.len() < pending.len() {
            record.narrow_pending(unresolved);
            Refresh::Narrowed
        } else {
            Refresh::Unchanged
        }
    }

    fn service_requests(&mut self, touched: &HashSet<FrameId>) {
        if touched.is_empty() || self.requests.is_empty() {
            return;
        }

        let mut index = 0;
        while index < self.requests.len() {
            if !self.requests[index].is_blocked_by(touched) {
                index += 1;
                continue;
            }
            let request = &self.requests[index];
            let readiness = self.checker().check(request.root, request.references.iter().copied());
            if readiness.is_ready() {
                let request = self.requests.remove(index);
                self.fulfill(request);
            } else {
                let request = &mut self.requests[index];
                request.unsatisfied = readiness.missing;
                request.watched = readiness.visited;
                index += 1;
            }
        }
    }

    fn fulfill(&mut self, mut request: PendingRequest) {
        let Some(callback) = request.finish() else {
            return;
        };
        let (status, bytes) = self.composite(&request);
        info!("[COMPOSITOR] {} for frame {} fulfilled: {}", request.id, request.root, status);
        callback(status, bytes);
        self.try_complete_document();
    }

    fn composite(&mut self, request: &PendingRequest) -> (CompositionStatus, Vec<u8>) {
        let mut substituter = Substituter::new(&mut self.store, &self.graph, self.codec.as_ref());
        let decoded = substituter.compose_root(request.root, &request.content);
        let report = substituter.into_report();
        debug!(
            "[COMPOSITOR] {} decoded {} frames, blanked {} references.",
            request.id,
            report.decoded_frames,
            report.blanked.len()
        );

        let mut pages = match decoded {
            Ok(pages) => pages,
            Err(err) => {
                warn!("[COMPOSITOR] {} has malformed content: {}", request.id, err);
                if let (CompositionTarget::Page(page_number), Some(accumulator)) =
                    (request.target, self.accumulator.as_mut())
                {
                    accumulator.fail_page(page_number);
                }
                return (CompositionStatus::ContentFormatError, Vec::new());
            }
        };
        let partial = report.is_partial();

        let pages: Vec<Arc<Picture>> = match request.target {
            CompositionTarget::Page(page_number) => {
                pages.truncate(1);
                let page: Vec<Arc<Picture>> = pages.into_iter().map(Arc::new).collect();
                if let (Some(accumulator), Some(first)) = (self.accumulator.as_mut(), page.first()) {
                    accumulator.add_page(page_number, first.clone(), partial);
                }
                page
            }
            CompositionTarget::Document => pages.into_iter().map(Arc::new).collect(),
        };

        self.write(&pages, partial)
    }

    fn write(&self, pages: &[Arc<Picture>], partial: bool) -> (CompositionStatus, Vec<u8>) {
        match self.writer.write_document(pages, &self.options.document_info) {
            Ok(bytes) if partial => (CompositionStatus::PartialContent, bytes),
            Ok(bytes) => (CompositionStatus::Success, bytes),
            Err(err) => {
                warn!("[COMPOSITOR] Document writer failed: {}", err);
                (CompositionStatus::CompositingFailure, Vec::new())
            }
        }
    }

    fn try_complete_document(&mut self) {
        let Some(CompletedDocument { pages, partial, failed_page, callback }) =
            self.accumulator.as_mut().and_then(DocumentAccumulator::take_completed)
        else {
            return;
        };
        self.accumulator = None;
        if let Some(page_number) = failed_page {
            warn!("[COMPOSITOR] Document abandoned: page {} could not be composed.", page_number);
            callback(CompositionStatus::ContentFormatError, Vec::new());
            return;
        }
        let (status, bytes) = self.write(&pages, partial);
        info!("[COMPOSITOR] Document with {} pages completed: {}", pages.len(), status);
        callback(status, bytes);
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("frames", &self.store.len())
            .field("edges", &self.graph.edge_count())
            .field("root_frame", &self.root_frame)
            .field("pending_requests", &self.requests.len())
            .field("accumulating", &self.accumulator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collate_render_core::{CodecError, DrawOp, JsonPictureCodec, Recording, RenderError};
    use collate_types::{Rect, Size};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Outcomes = Arc<Mutex<Vec<(CompositionStatus, Vec<u8>)>>>;

    /// Captures the pages it is asked to write; the output bytes are the
    /// page count.
    #[derive(Debug, Default)]
    struct CapturingWriter {
        written: Mutex<Vec<Vec<Arc<Picture>>>>,
        fail: bool,
    }

    impl DocumentWriter for CapturingWriter {
        fn write_document(&self, pages: &[Arc<Picture>], _info: &DocumentInfo) -> Result<Vec<u8>, RenderError> {
            if self.fail {
                return Err(RenderError::Other("disk full".into()));
            }
            self.written.lock().unwrap().push(pages.to_vec());
            Ok(vec![pages.len() as u8])
        }
    }

    #[derive(Debug, Default)]
    struct CountingCodec {
        decodes: AtomicUsize,
    }

    impl PictureCodec for CountingCodec {
        fn decode(
            &self,
            bytes: &[u8],
            lookup: &mut dyn FnMut(ContentId) -> Arc<Picture>,
        ) -> Result<Vec<Picture>, CodecError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            JsonPictureCodec.decode(bytes, lookup)
        }

        fn encode(
            &self,
            pages: &[Picture],
            assign: &mut dyn FnMut(&Arc<Picture>) -> ContentId,
        ) -> Result<Vec<u8>, CodecError> {
            JsonPictureCodec.encode(pages, assign)
        }
    }

    struct Harness {
        compositor: Compositor,
        writer: Arc<CapturingWriter>,
        outcomes: Outcomes,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_parts(Arc::new(JsonPictureCodec), CapturingWriter::default())
        }

        fn with_parts(codec: Arc<dyn PictureCodec>, writer: CapturingWriter) -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            let writer = Arc::new(writer);
            Self {
                compositor: Compositor::new(codec, writer.clone()),
                writer,
                outcomes: Arc::default(),
            }
        }

        fn callback(&self) -> impl FnOnce(CompositionStatus, Vec<u8>) + Send + 'static {
            let outcomes = self.outcomes.clone();
            move |status, bytes| outcomes.lock().unwrap().push((status, bytes))
        }

        fn submit(&mut self, frame: FrameId, recording: Recording) {
            let refs = recording.placeholder_ids();
            self.compositor.submit_content(frame, recording.to_bytes().unwrap(), refs).unwrap();
        }

        fn request_page(&mut self, root: FrameId, recording: Recording) -> RequestId {
            let refs = recording.placeholder_ids();
            let callback = self.callback();
            self.compositor.request_page_composition(root, 1, recording.to_bytes().unwrap(), refs, callback)
        }

        fn statuses(&self) -> Vec<CompositionStatus> {
            self.outcomes.lock().unwrap().iter().map(|(status, _)| *status).collect()
        }

        fn last_page(&self) -> Arc<Picture> {
            self.writer.written.lock().unwrap().last().unwrap()[0].clone()
        }
    }

    fn frame(raw: u64) -> FrameId {
        FrameId::new(raw)
    }

    fn cid(raw: u32) -> ContentId {
        ContentId::new(raw)
    }

    fn bounds() -> Rect {
        Rect::new(0.0, 0.0, 200.0, 100.0)
    }

    fn labelled(label: &str) -> Recording {
        Recording::new().page(Size::new(200.0, 100.0)).text(0.0, 0.0, 12.0, label)
    }

    fn nested(picture: &Picture, index: usize) -> Arc<Picture> {
        match &picture.ops[index] {
            DrawOp::Subframe { picture, .. } => picture.clone(),
            op => panic!("expected a subframe, got {:?}", op),
        }
    }

    #[test]
    fn test_frame_with_known_ready_target_is_ready_immediately() {
        let mut h = Harness::new();
        h.compositor.register_reference(frame(1), cid(3), frame(2));
        h.submit(frame(2), labelled("two"));
        h.submit(frame(1), labelled("one").placeholder(cid(3), bounds()));

        assert!(h.compositor.is_frame_ready(frame(2)));
        assert!(h.compositor.is_frame_ready(frame(1)));
        assert!(h.compositor.missing_for(frame(1)).is_empty());
    }

    #[test]
    fn test_reverse_arrival_becomes_ready_on_last_submission() {
        let mut h = Harness::new();
        h.submit(frame(1), labelled("one").placeholder(cid(3), bounds()));
        assert_eq!(h.compositor.missing_for(frame(1))[0].content_id, cid(3));

        h.request_page(frame(1), Recording::new().placeholder(cid(3), bounds()));
        h.compositor.register_reference(frame(1), cid(3), frame(2));
        assert!(!h.compositor.is_frame_ready(frame(1)));
        assert_eq!(h.compositor.missing_for(frame(1))[0].blocked_on, frame(2));
        assert_eq!(h.compositor.pending_request_count(), 1);

        h.submit(frame(2), labelled("two"));
        assert!(h.compositor.is_frame_ready(frame(1)));
        assert_eq!(h.compositor.pending_request_count(), 0);
        assert_eq!(h.statuses(), vec![CompositionStatus::Success]);
    }

    #[test]
    fn test_waiting_request_fulfilled_once_in_either_order() {
        for register_first in [true, false] {
            let mut h = Harness::new();
            h.request_page(frame(1), Recording::new().placeholder(cid(2), bounds()));
            assert_eq!(h.compositor.pending_request_count(), 1);
            assert!(h.statuses().is_empty());

            if register_first {
                h.compositor.register_reference(frame(1), cid(2), frame(3));
                h.submit(frame(3), labelled("three"));
            } else {
                h.submit(frame(3), labelled("three"));
                h.compositor.register_reference(frame(1), cid(2), frame(3));
            }

            assert_eq!(h.statuses(), vec![CompositionStatus::Success]);
            assert_eq!(h.compositor.pending_request_count(), 0);
            assert_eq!(h.compositor.root_frame(), Some(frame(1)));

            // Later traffic does not fire the callback again.
            h.submit(frame(4), labelled("four"));
            assert_eq!(h.statuses().len(), 1);
        }
    }

    #[test]
    fn test_cycle_is_ready_and_substitutes_blank_self_reference() {
        let mut h = Harness::new();
        h.compositor.register_reference(frame(10), cid(1), frame(11));
        h.compositor.register_reference(frame(11), cid(2), frame(10));
        h.submit(frame(10), labelled("a").placeholder(cid(1), bounds()));
        h.submit(frame(11), labelled("b").placeholder(cid(2), bounds()));

        assert!(h.compositor.is_frame_ready(frame(10)));
        assert!(h.compositor.is_frame_ready(frame(11)));

        // Rooted at A: B is inlined and B's reference back to A is cut.
        h.request_page(frame(10), Recording::new().placeholder(cid(1), bounds()));
        let b = nested(&h.last_page(), 0);
        assert!(matches!(&b.ops[0], DrawOp::Text { text, .. } if text == "b"));
        assert!(nested(&b, 1).is_blank());

        // Rooted elsewhere: A, then B, then the cut back to A.
        h.compositor.register_reference(frame(99), cid(5), frame(10));
        h.request_page(frame(99), Recording::new().placeholder(cid(5), bounds()));
        let a = nested(&h.last_page(), 0);
        assert!(matches!(&a.ops[0], DrawOp::Text { text, .. } if text == "a"));
        let b = nested(&a, 1);
        assert!(matches!(&b.ops[0], DrawOp::Text { text, .. } if text == "b"));
        assert!(nested(&b, 1).is_blank());
        assert_eq!(h.statuses(), vec![CompositionStatus::Success; 2]);
    }

    #[test]
    fn test_conflicting_registration_last_write_wins() {
        let mut h = Harness::new();
        h.submit(frame(2), labelled("old"));
        h.submit(frame(3), labelled("new"));
        h.compositor.register_reference(frame(1), cid(1), frame(2));
        h.compositor.register_reference(frame(1), cid(1), frame(3));

        h.request_page(frame(1), Recording::new().placeholder(cid(1), bounds()));
        let page = h.last_page();
        assert!(matches!(&nested(&page, 0).ops[0], DrawOp::Text { text, .. } if text == "new"));
    }

    #[test]
    fn test_conflicting_registration_first_write_wins_when_configured() {
        let mut h = Harness::new();
        h.compositor = Compositor::new(Arc::new(JsonPictureCodec), h.writer.clone()).with_options(
            CompositorOptions { conflict_policy: ConflictPolicy::FirstWriteWins, ..Default::default() },
        );
        h.submit(frame(2), labelled("old"));
        h.submit(frame(3), labelled("new"));
        h.compositor.register_reference(frame(1), cid(1), frame(2));
        h.compositor.register_reference(frame(1), cid(1), frame(3));

        h.request_page(frame(1), Recording::new().placeholder(cid(1), bounds()));
        let page = h.last_page();
        assert!(matches!(&nested(&page, 0).ops[0], DrawOp::Text { text, .. } if text == "old"));
    }

    #[test]
    fn test_malformed_root_content_does_not_affect_other_requests() {
        let mut h = Harness::new();
        let callback = h.callback();
        h.compositor.request_document_composition(frame(1), br#"{"pages":[]}"#.to_vec(), Vec::new(), callback);
        h.request_page(frame(2), labelled("fine"));

        assert_eq!(h.statuses(), vec![CompositionStatus::ContentFormatError, CompositionStatus::Success]);
        assert!(h.outcomes.lock().unwrap()[0].1.is_empty());
    }

    #[test]
    fn test_shared_dependency_is_decoded_once() {
        let codec = Arc::new(CountingCodec::default());
        let mut h = Harness::with_parts(codec.clone(), CapturingWriter::default());
        h.submit(frame(9), labelled("shared"));
        for owner in 1..=3u64 {
            h.compositor.register_reference(frame(owner), cid(1), frame(9));
            h.submit(frame(owner), labelled("owner").placeholder(cid(1), bounds()));
        }

        let page = Recording::new()
            .placeholder(cid(1), bounds())
            .placeholder(cid(2), bounds())
            .placeholder(cid(3), bounds());
        for (content_id, owner) in [(1, 1), (2, 2), (3, 3)] {
            h.compositor.register_reference(frame(100), cid(content_id), frame(owner));
        }
        h.request_page(frame(100), page.clone());
        h.request_page(frame(100), page);

        // Root twice, three owners once, the shared frame once.
        assert_eq!(codec.decodes.load(Ordering::SeqCst), 2 + 3 + 1);
        assert_eq!(h.statuses(), vec![CompositionStatus::Success; 2]);
    }

    #[test]
    fn test_cyclic_diamond_chain_decodes_each_frame_once() {
        let codec = Arc::new(CountingCodec::default());
        let mut h = Harness::with_parts(codec.clone(), CapturingWriter::default());
        let depth = 16u64;
        for level in 1..=depth {
            let next = if level == depth { frame(1) } else { frame(level + 1) };
            h.compositor.register_reference(frame(level), cid(1), next);
            h.compositor.register_reference(frame(level), cid(2), next);
            h.submit(frame(level), labelled("link").placeholder(cid(1), bounds()).placeholder(cid(2), bounds()));
        }
        h.compositor.register_reference(frame(1000), cid(1), frame(1));
        h.request_page(frame(1000), Recording::new().placeholder(cid(1), bounds()));

        // Root once, every frame in the chain once.
        assert_eq!(codec.decodes.load(Ordering::SeqCst), 1 + depth as usize);
        assert_eq!(h.statuses(), vec![CompositionStatus::Success]);

        let mut picture = nested(&h.last_page(), 0);
        for _ in 1..depth {
            assert!(Arc::ptr_eq(&nested(&picture, 1), &nested(&picture, 2)));
            picture = nested(&picture, 1);
        }
        assert!(nested(&picture, 1).is_blank());
        assert!(nested(&picture, 2).is_blank());
    }

    #[test]
    fn test_ready_frames_stay_ready_after_retargeting() {
        let mut h = Harness::new();
        h.compositor.register_reference(frame(1), cid(1), frame(2));
        h.submit(frame(2), labelled("two"));
        h.submit(frame(1), labelled("one").placeholder(cid(1), bounds()));
        assert!(h.compositor.is_frame_ready(frame(1)));

        h.compositor.register_reference(frame(1), cid(1), frame(5));
        assert!(h.compositor.is_frame_ready(frame(1)));

        h.compositor.register_reference(frame(100), cid(1), frame(1));
        h.request_page(frame(100), Recording::new().placeholder(cid(1), bounds()));
        assert_eq!(h.statuses(), vec![CompositionStatus::PartialContent]);
    }

    #[test]
    fn test_resubmission_is_refused() {
        let mut h = Harness::new();
        h.submit(frame(1), labelled("first"));
        let err = h.compositor.submit_content(frame(1), b"{}".to_vec(), Vec::<ContentId>::new()).unwrap_err();
        assert!(matches!(err, ComposerError::ContentAlreadySubmitted(_)));
    }

    #[test]
    fn test_unavailable_frame_unblocks_with_partial_content() {
        let mut h = Harness::new();
        h.compositor.register_reference(frame(1), cid(1), frame(2));
        h.request_page(frame(1), Recording::new().placeholder(cid(1), bounds()));
        assert_eq!(h.compositor.pending_request_count(), 1);

        h.compositor.notify_unavailable_frame(frame(2));
        assert_eq!(h.statuses(), vec![CompositionStatus::PartialContent]);
        assert!(nested(&h.last_page(), 0).is_blank());
        assert!(h.compositor.submit_content(frame(2), b"{}".to_vec(), Vec::<ContentId>::new()).is_err());
    }

    #[test]
    fn test_writer_failure_reports_compositing_failure() {
        let writer = CapturingWriter { fail: true, ..Default::default() };
        let mut h = Harness::with_parts(Arc::new(JsonPictureCodec), writer);
        h.request_page(frame(1), labelled("page"));
        assert_eq!(h.statuses(), vec![CompositionStatus::CompositingFailure]);
    }

    #[test]
    fn test_document_accumulation_completes_after_last_page() {
        let mut h = Harness::new();
        assert!(h.compositor.complete_document(1, |_, _| {}).is_err());
        h.compositor.prepare_for_document().unwrap();
        assert!(h.compositor.prepare_for_document().is_err());

        let callback = h.callback();
        h.compositor.request_page_composition(frame(1), 0, labelled("p0").to_bytes().unwrap(), Vec::new(), callback);
        let done: Outcomes = Arc::default();
        let sink = done.clone();
        h.compositor
            .complete_document(2, move |status, bytes| sink.lock().unwrap().push((status, bytes)))
            .unwrap();
        assert!(done.lock().unwrap().is_empty());

        let callback = h.callback();
        h.compositor.request_page_composition(
            frame(1),
            1,
            Recording::new().placeholder(cid(1), bounds()).to_bytes().unwrap(),
            [cid(1)],
            callback,
        );
        assert!(done.lock().unwrap().is_empty());
        h.compositor.register_reference(frame(1), cid(1), frame(2));
        h.submit(frame(2), labelled("late"));

        let done = done.lock().unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0], (CompositionStatus::Success, vec![2]));
    }

    #[test]
    fn test_document_is_abandoned_when_a_page_fails() {
        let mut h = Harness::new();
        h.compositor.prepare_for_document().unwrap();
        let done: Outcomes = Arc::default();
        let sink = done.clone();
        h.compositor
            .complete_document(2, move |status, bytes| sink.lock().unwrap().push((status, bytes)))
            .unwrap();

        let callback = h.callback();
        h.compositor.request_page_composition(frame(1), 0, labelled("p0").to_bytes().unwrap(), Vec::new(), callback);
        assert!(done.lock().unwrap().is_empty());
        let callback = h.callback();
        h.compositor.request_page_composition(frame(1), 1, b"not a recording".to_vec(), Vec::new(), callback);

        assert_eq!(h.statuses(), vec![CompositionStatus::Success, CompositionStatus::ContentFormatError]);
        assert_eq!(*done.lock().unwrap(), vec![(CompositionStatus::ContentFormatError, Vec::new())]);
        // Accumulation is over; a new document can be prepared.
        assert!(h.compositor.prepare_for_document().is_ok());
    }

    #[test]
    fn test_zero_page_document_is_a_format_error() {
        let mut h = Harness::new();
        h.compositor.prepare_for_document().unwrap();
        let callback = h.callback();
        h.compositor.complete_document(0, callback).unwrap();
        assert_eq!(h.statuses(), vec![CompositionStatus::ContentFormatError]);
    }
}
