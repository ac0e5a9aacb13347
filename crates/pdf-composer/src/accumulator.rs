use crate::error::ComposerError;
use crate::request::CompositionCallback;
use collate_render_core::Picture;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collects individually composed pages until the whole document can be
/// written in one go.
#[derive(Default)]
pub(crate) struct DocumentAccumulator {
    pages: BTreeMap<u32, Arc<Picture>>,
    partial: bool,
    /// The first page number whose composition failed before it was collected.
    failed: Option<u32>,
    completion: Option<(u32, CompositionCallback)>,
}

/// Everything needed to write and report the finished document.
pub(crate) struct CompletedDocument {
    pub pages: Vec<Arc<Picture>>,
    pub partial: bool,
    /// Set when a page could not be composed; the document is not written.
    pub failed_page: Option<u32>,
    pub callback: CompositionCallback,
}

impl DocumentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a composed page. The first composition of a page number wins.
    pub fn add_page(&mut self, page_number: u32, picture: Arc<Picture>, partial: bool) {
        if self.pages.contains_key(&page_number) {
            log::debug!("[COMPOSITOR] Page {} already collected, keeping the first one.", page_number);
            return;
        }
        self.pages.insert(page_number, picture);
        self.partial |= partial;
    }

    /// Records a page whose composition failed. A page already collected
    /// keeps its first composition.
    pub fn fail_page(&mut self, page_number: u32) {
        if self.pages.contains_key(&page_number) || self.failed.is_some() {
            return;
        }
        self.failed = Some(page_number);
    }

    pub fn set_completion(&mut self, page_count: u32, callback: CompositionCallback) -> Result<(), ComposerError> {
        if self.completion.is_some() {
            return Err(ComposerError::Accumulation("complete_document was already called".into()));
        }
        self.completion = Some((page_count, callback));
        Ok(())
    }

    pub fn collected(&self) -> usize {
        self.pages.len()
    }

    /// Hands out the document once the expected number of pages is in, or
    /// as soon as one of its pages has failed.
    pub fn take_completed(&mut self) -> Option<CompletedDocument> {
        let expected = self.completion.as_ref().map(|(count, _)| *count as usize)?;
        if self.failed.is_none() && self.pages.len() < expected {
            return None;
        }
        let (_, callback) = self.completion.take()?;
        let pages = std::mem::take(&mut self.pages).into_values().take(expected).collect();
        Some(CompletedDocument { pages, partial: self.partial, failed_page: self.failed, callback })
    }
}
