use collate::{ContentId, Rect, Recording, Size};
use std::collections::BTreeSet;

pub const FRAME_SIZE: Size = Size { width: 300.0, height: 200.0 };

/// Bounds for the `slot`th placeholder, stacked down the page.
pub fn slot(index: usize) -> Rect {
    Rect::new(20.0, 20.0 + index as f32 * 110.0, 300.0, 100.0)
}

/// A frame drawing a single line of text.
pub fn labelled(label: &str) -> Recording {
    Recording::new().page(FRAME_SIZE).text(10.0, 10.0, 14.0, label)
}

/// A frame drawing its label followed by one placeholder per id.
pub fn embedding(label: &str, ids: &[ContentId]) -> Recording {
    ids.iter()
        .enumerate()
        .fold(labelled(label), |recording, (index, id)| recording.placeholder(*id, slot(index)))
}

/// A letter-sized page made only of placeholders.
pub fn page_of(ids: &[ContentId]) -> Recording {
    ids.iter()
        .enumerate()
        .fold(Recording::new().page(Size::letter()), |recording, (index, id)| recording.placeholder(*id, slot(index)))
}

pub fn bytes(recording: &Recording) -> Vec<u8> {
    recording.to_bytes().expect("recordings always serialize")
}

pub fn ids(recording: &Recording) -> BTreeSet<ContentId> {
    recording.placeholder_ids()
}
