use crate::graph::DependencyGraph;
use crate::store::ContentStore;
use collate_types::{ContentId, FrameId};
use std::collections::{BTreeSet, HashSet};

/// A reference that cannot be resolved yet.
///
/// `blocked_on` is the frame whose state has to change first: the owner
/// itself while the placeholder has no registered target, otherwise the
/// target that has not delivered content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MissingReference {
    pub owner: FrameId,
    pub content_id: ContentId,
    pub blocked_on: FrameId,
}

/// Result of a full readiness check.
#[derive(Debug, Default)]
pub struct Readiness {
    pub missing: BTreeSet<MissingReference>,
    /// Every frame the check walked through. A change to any of them may
    /// change the answer.
    pub visited: HashSet<FrameId>,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Walks the dependency graph to decide whether a set of references can be
/// substituted right now.
pub struct ReadinessChecker<'a> {
    store: &'a ContentStore,
    graph: &'a DependencyGraph,
}

impl<'a> ReadinessChecker<'a> {
    pub fn new(store: &'a ContentStore, graph: &'a DependencyGraph) -> Self {
        Self { store, graph }
    }

    pub fn check<I>(&self, frame: FrameId, references: I) -> Readiness
    where
        I: IntoIterator<Item = ContentId>,
    {
        let mut readiness = Readiness::default();
        self.is_ready(frame, references, &mut readiness.missing, &mut readiness.visited);
        readiness
    }

    /// Returns whether every reference of `frame` in `references` resolves.
    ///
    /// `visited` must be threaded through every recursive call: a target
    /// already in it is either on the current path (a cycle, treated as
    /// satisfied) or was fully explored earlier in this walk, in which case
    /// whatever it was missing is already in `missing`.
    pub fn is_ready<I>(
        &self,
        frame: FrameId,
        references: I,
        missing: &mut BTreeSet<MissingReference>,
        visited: &mut HashSet<FrameId>,
    ) -> bool
    where
        I: IntoIterator<Item = ContentId>,
    {
        visited.insert(frame);
        let mut ready = true;

        for content_id in references {
            let Some(target) = self.graph.target(frame, content_id) else {
                missing.insert(MissingReference { owner: frame, content_id, blocked_on: frame });
                ready = false;
                continue;
            };
            if visited.contains(&target) {
                continue;
            }

            match self.store.get(target) {
                Some(record) if record.is_ready() => {}
                Some(record) if record.has_content() => {
                    let pending: Vec<ContentId> = record.pending().iter().copied().collect();
                    if !self.is_ready(target, pending, missing, visited) {
                        ready = false;
                    }
                }
                _ => {
                    missing.insert(MissingReference { owner: frame, content_id, blocked_on: target });
                    ready = false;
                }
            }
        }

        ready
    }

    /// The subset of `references` that does not resolve, each checked on its
    /// own so one blocked placeholder does not hold back its siblings.
    pub fn unresolved<I>(&self, frame: FrameId, references: I) -> BTreeSet<ContentId>
    where
        I: IntoIterator<Item = ContentId>,
    {
        references
            .into_iter()
            .filter(|content_id| !self.check(frame, [*content_id]).is_ready())
            .collect()
    }
}
