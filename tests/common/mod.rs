#![allow(dead_code)]

pub mod fixtures;
pub mod pdf_assertions;

use collate::{CompositionStatus, Compositor, ContentId, FrameId, JsonPictureCodec, LopdfDocumentWriter};
use lopdf::Document as LopdfDocument;
use std::sync::{Arc, Mutex};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Wrapper around a generated PDF with helper methods
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub doc: LopdfDocument,
}

impl GeneratedPdf {
    /// Create a GeneratedPdf from raw bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Box<dyn std::error::Error>> {
        let doc = LopdfDocument::load_mem(&bytes)?;
        Ok(Self { bytes, doc })
    }

    /// Get the number of pages in the PDF
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Save PDF to a file for manual debugging
    pub fn save_for_debug(&self, name: &str) -> std::io::Result<()> {
        std::fs::write(format!("test_output_{}.pdf", name), &self.bytes)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn frame(raw: u64) -> FrameId {
    FrameId::new(raw)
}

pub fn cid(raw: u32) -> ContentId {
    ContentId::new(raw)
}

/// A compositor wired to the JSON codec and the real PDF writer.
pub fn pdf_compositor() -> Compositor {
    init_logging();
    Compositor::new(Arc::new(JsonPictureCodec), Arc::new(LopdfDocumentWriter::new()))
}

/// Collects every callback invocation for later inspection.
#[derive(Clone, Default)]
pub struct Outcomes(Arc<Mutex<Vec<(CompositionStatus, Vec<u8>)>>>);

impl Outcomes {
    pub fn callback(&self) -> impl FnOnce(CompositionStatus, Vec<u8>) + Send + 'static {
        let sink = self.0.clone();
        move |status, bytes| sink.lock().unwrap().push((status, bytes))
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn statuses(&self) -> Vec<CompositionStatus> {
        self.0.lock().unwrap().iter().map(|(status, _)| *status).collect()
    }

    pub fn bytes(&self, index: usize) -> Vec<u8> {
        self.0.lock().unwrap()[index].1.clone()
    }

    pub fn pdf(&self, index: usize) -> Result<GeneratedPdf, Box<dyn std::error::Error>> {
        GeneratedPdf::from_bytes(self.bytes(index))
    }
}
