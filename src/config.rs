use crate::error::SessionError;
use collate_pdf_composer::{CompositorOptions, ConflictPolicy};
use collate_render_core::DocumentInfo;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Settings for one composition session.
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```json
/// { "timeout_ms": 30000, "document_info": { "title": "Quarterly report" } }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The whole session is discarded this long after it starts. `None`
    /// keeps it alive until every handle is dropped.
    pub timeout_ms: Option<u64>,
    /// Commands buffered between handles and the session task.
    pub channel_capacity: usize,
    pub pdf_version: String,
    pub document_info: DocumentInfo,
    pub conflict_policy: ConflictPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            channel_capacity: 64,
            pdf_version: "1.7".to_string(),
            document_info: DocumentInfo::default(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let source = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&source)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn compositor_options(&self) -> CompositorOptions {
        CompositorOptions { conflict_policy: self.conflict_policy, document_info: self.document_info.clone() }
    }
}
