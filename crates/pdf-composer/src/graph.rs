use collate_types::{ContentId, FrameId};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// What happens when `(owner, content_id)` is registered again with a
/// different target frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The newer target replaces the older one.
    #[default]
    LastWriteWins,
    /// The first registered target is kept.
    FirstWriteWins,
}

/// Outcome of [`DependencyGraph::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// The same edge was already known.
    Unchanged,
    Replaced { previous: FrameId },
    Kept { existing: FrameId },
}

/// The substitution edges between frames.
///
/// `children` maps an owner frame's placeholder to the frame whose content
/// replaces it. `dependents` is the reverse index: for every target frame,
/// the `(owner, content_id)` pairs waiting on it.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    children: HashMap<FrameId, BTreeMap<ContentId, FrameId>>,
    dependents: HashMap<FrameId, BTreeSet<(FrameId, ContentId)>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        owner: FrameId,
        content_id: ContentId,
        target: FrameId,
        policy: ConflictPolicy,
    ) -> Registration {
        let slot = self.children.entry(owner).or_default();
        let registration = match slot.get(&content_id).copied() {
            None => Registration::Inserted,
            Some(existing) if existing == target => return Registration::Unchanged,
            Some(existing) => match policy {
                ConflictPolicy::FirstWriteWins => return Registration::Kept { existing },
                ConflictPolicy::LastWriteWins => Registration::Replaced { previous: existing },
            },
        };

        slot.insert(content_id, target);
        if let Registration::Replaced { previous } = registration {
            if let Some(waiting) = self.dependents.get_mut(&previous) {
                waiting.remove(&(owner, content_id));
                if waiting.is_empty() {
                    self.dependents.remove(&previous);
                }
            }
        }
        self.dependents.entry(target).or_default().insert((owner, content_id));
        registration
    }

    pub fn target(&self, owner: FrameId, content_id: ContentId) -> Option<FrameId> {
        self.children.get(&owner)?.get(&content_id).copied()
    }

    /// All placeholders of `owner` with a known target, in content id order.
    pub fn children(&self, owner: FrameId) -> impl Iterator<Item = (ContentId, FrameId)> + '_ {
        self.children
            .get(&owner)
            .into_iter()
            .flat_map(|map| map.iter().map(|(id, target)| (*id, *target)))
    }

    /// The `(owner, content_id)` pairs that resolve to `target`.
    pub fn dependents(&self, target: FrameId) -> impl Iterator<Item = (FrameId, ContentId)> + '_ {
        self.dependents.get(&target).into_iter().flat_map(|set| set.iter().copied())
    }

    /// Distinct owner frames waiting on `target`, in frame id order.
    pub fn dependent_frames(&self, target: FrameId) -> Vec<FrameId> {
        let mut frames: Vec<FrameId> = self.dependents(target).map(|(owner, _)| owner).collect();
        frames.dedup();
        frames
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(BTreeMap::len).sum()
    }
}
