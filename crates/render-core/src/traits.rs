use crate::error::RenderError;
use crate::picture::Picture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Metadata written into every produced document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default)]
    pub title: Option<String>,
    /// The address of the page the document was printed from.
    #[serde(default)]
    pub source_url: Option<String>,
}

impl DocumentInfo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.source_url.is_none()
    }
}

/// Final assembly of composed pages into document bytes.
pub trait DocumentWriter: Send + Sync {
    /// Writes one document page per picture, in order.
    fn write_document(&self, pages: &[Arc<Picture>], info: &DocumentInfo) -> Result<Vec<u8>, RenderError>;
}
