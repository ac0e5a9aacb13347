//! Recursive substitution of frame content into placeholders.

use crate::graph::DependencyGraph;
use crate::store::ContentStore;
use collate_render_core::{CodecError, Picture, PictureCodec};
use collate_types::{ContentId, FrameId, Size};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Why a placeholder was drawn blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankReason {
    /// The target is already being composited further up.
    Cycle,
    /// No target frame was registered for the placeholder.
    Unregistered,
    /// The target frame has not delivered content.
    NoContent,
    /// The target frame will never deliver content.
    Unavailable,
    /// The target frame's content could not be decoded.
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankedReference {
    pub owner: FrameId,
    pub content_id: ContentId,
    pub target: Option<FrameId>,
    pub reason: BlankReason,
}

#[derive(Debug, Default)]
pub struct SubstitutionReport {
    pub blanked: Vec<BlankedReference>,
    /// Frames whose content was decoded during this composition. Frames
    /// served from the cache are not counted.
    pub decoded_frames: usize,
}

impl SubstitutionReport {
    /// Cycle edges are expected and do not make the output partial.
    pub fn is_partial(&self) -> bool {
        self.blanked.iter().any(|blank| blank.reason != BlankReason::Cycle)
    }
}

struct Expansion {
    picture: Arc<Picture>,
    /// Frames whose presence on the compositing stack shaped the picture:
    /// cycle cut targets, plus every frame expanded under a cut. Empty when
    /// the picture is the same wherever the walk started.
    shaped_by: BTreeSet<FrameId>,
}

/// A cycle-shaped expansion, reusable within one composition while the
/// stack agrees with the one it was computed under on every frame in
/// `shaped_by`.
struct CyclicExpansion {
    picture: Arc<Picture>,
    shaped_by: BTreeSet<FrameId>,
    on_stack: BTreeSet<FrameId>,
    blanked: Vec<BlankedReference>,
}

/// Expands request content by decoding it and recursively replacing each
/// placeholder with its target frame's substituted picture.
///
/// Each frame's expansion is cached on its record the first time it is
/// computed, unless a cycle was cut inside it. Cut expansions are memoized
/// for the lifetime of the substituter only, keyed by the part of the stack
/// they depend on.
pub(crate) struct Substituter<'a> {
    store: &'a mut ContentStore,
    graph: &'a DependencyGraph,
    codec: &'a dyn PictureCodec,
    /// Frames currently being composited, outermost first.
    stack: Vec<FrameId>,
    cyclic: HashMap<FrameId, CyclicExpansion>,
    report: SubstitutionReport,
}

impl<'a> Substituter<'a> {
    pub fn new(store: &'a mut ContentStore, graph: &'a DependencyGraph, codec: &'a dyn PictureCodec) -> Self {
        Self {
            store,
            graph,
            codec,
            stack: Vec::new(),
            cyclic: HashMap::new(),
            report: SubstitutionReport::default(),
        }
    }

    /// Decodes the content of a composition request rooted at `root`.
    /// Placeholders resolve through `root`'s registered references.
    pub fn compose_root(&mut self, root: FrameId, content: &[u8]) -> Result<Vec<Picture>, CodecError> {
        self.stack.push(root);
        let codec = self.codec;
        let pages = codec.decode(content, &mut |content_id| self.resolve(root, content_id).0);
        self.stack.pop();
        pages
    }

    pub fn into_report(self) -> SubstitutionReport {
        self.report
    }

    fn resolve(&mut self, owner: FrameId, content_id: ContentId) -> (Arc<Picture>, BTreeSet<FrameId>) {
        let Some(target) = self.graph.target(owner, content_id) else {
            self.record_blank(owner, content_id, None, BlankReason::Unregistered);
            return (blank(), BTreeSet::new());
        };

        match self.substitute(target) {
            Ok(expansion) => (expansion.picture, expansion.shaped_by),
            Err(BlankReason::Cycle) => {
                self.record_blank(owner, content_id, Some(target), BlankReason::Cycle);
                (blank(), BTreeSet::from([target]))
            }
            Err(reason) => {
                self.record_blank(owner, content_id, Some(target), reason);
                (blank(), BTreeSet::new())
            }
        }
    }

    fn substitute(&mut self, frame: FrameId) -> Result<Expansion, BlankReason> {
        if self.stack.contains(&frame) {
            return Err(BlankReason::Cycle);
        }

        let record = self.store.get(frame).ok_or(BlankReason::NoContent)?;
        if let Some(picture) = record.substituted() {
            return Ok(Expansion { picture: picture.clone(), shaped_by: BTreeSet::new() });
        }
        if record.is_unavailable() {
            return Err(BlankReason::Unavailable);
        }
        if record.is_malformed() {
            return Err(BlankReason::Malformed);
        }
        let content = record.content().cloned().ok_or(BlankReason::NoContent)?;

        if let Some(expansion) = self.reuse_cyclic(frame) {
            return Ok(expansion);
        }

        let first_blank = self.report.blanked.len();
        self.stack.push(frame);
        let codec = self.codec;
        let mut shaped_by = BTreeSet::new();
        let decoded = codec.decode(&content, &mut |content_id| {
            let (picture, shaped) = self.resolve(frame, content_id);
            shaped_by.extend(shaped);
            picture
        });
        self.stack.pop();
        self.report.decoded_frames += 1;

        // A frame contributes its first page; anything after it is ignored.
        let page = match decoded {
            Ok(pages) => pages.into_iter().next(),
            Err(err) => {
                warn!("[SUBSTITUTE] Content of frame {} is malformed: {}", frame, err);
                None
            }
        };
        let Some(page) = page else {
            if let Some(record) = self.store.get_mut(frame) {
                record.mark_malformed();
            }
            return Err(BlankReason::Malformed);
        };

        let picture = Arc::new(page);
        if shaped_by.is_empty() {
            if let Some(record) = self.store.get_mut(frame) {
                record.set_substituted(picture.clone());
            }
            return Ok(Expansion { picture, shaped_by });
        }

        // The frame itself is always on the stack while it expands.
        shaped_by.remove(&frame);
        let on_stack = shaped_by.iter().copied().filter(|f| self.stack.contains(f)).collect();
        self.cyclic.insert(
            frame,
            CyclicExpansion {
                picture: picture.clone(),
                shaped_by: shaped_by.clone(),
                on_stack,
                blanked: self.report.blanked[first_blank..].to_vec(),
            },
        );
        shaped_by.insert(frame);
        Ok(Expansion { picture, shaped_by })
    }

    /// Returns the memoized cut expansion of `frame` if every frame that
    /// shaped it has the same stack membership now as when it was computed.
    fn reuse_cyclic(&mut self, frame: FrameId) -> Option<Expansion> {
        let memo = self.cyclic.get(&frame)?;
        let stack = &self.stack;
        if !memo.shaped_by.iter().all(|f| stack.contains(f) == memo.on_stack.contains(f)) {
            return None;
        }
        debug!("[SUBSTITUTE] Reusing cut expansion of frame {}.", frame);
        self.report.blanked.extend(memo.blanked.iter().cloned());
        let mut shaped_by = memo.shaped_by.clone();
        shaped_by.insert(frame);
        Some(Expansion { picture: memo.picture.clone(), shaped_by })
    }

    fn record_blank(&mut self, owner: FrameId, content_id: ContentId, target: Option<FrameId>, reason: BlankReason) {
        match (reason, target) {
            (BlankReason::Cycle, Some(target)) => {
                debug!("[SUBSTITUTE] Cycle at {} {} -> {}, drawing blank.", owner, content_id, target)
            }
            (_, Some(target)) => {
                warn!("[SUBSTITUTE] {} {} -> {} drawn blank: {:?}", owner, content_id, target, reason)
            }
            (_, None) => warn!("[SUBSTITUTE] {} {} has no registered target, drawing blank.", owner, content_id),
        }
        self.report.blanked.push(BlankedReference { owner, content_id, target, reason });
    }
}

fn blank() -> Arc<Picture> {
    Arc::new(Picture::blank(Size::zero()))
}
