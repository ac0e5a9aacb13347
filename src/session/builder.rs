// src/session/builder.rs
use super::handle::{SessionHandle, SessionState};
use super::service;
use crate::config::SessionConfig;
use crate::error::SessionError;
use collate_pdf_composer::{Compositor, ConflictPolicy};
use collate_render_core::{DocumentInfo, DocumentWriter, JsonPictureCodec, PictureCodec};
use collate_render_lopdf::LopdfDocumentWriter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinHandle};

/// A builder for starting a composition [`Session`].
pub struct SessionBuilder {
    config: SessionConfig,
    codec: Option<Arc<dyn PictureCodec>>,
    writer: Option<Arc<dyn DocumentWriter>>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self { config: SessionConfig::default(), codec: None, writer: None }
    }
}

impl SessionBuilder {
    /// Creates a builder with the JSON recording codec and the lopdf writer.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the codec used to decode frame recordings.
    pub fn with_codec(mut self, codec: Arc<dyn PictureCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Replaces the document writer. When set, the configured PDF version is
    /// not used.
    pub fn with_writer(mut self, writer: Arc<dyn DocumentWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_document_info(mut self, info: DocumentInfo) -> Self {
        self.config.document_info = info;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.config.conflict_policy = policy;
        self
    }

    /// Spawns the session task on the current tokio runtime.
    pub fn build(self) -> Session {
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonPictureCodec));
        let writer = self
            .writer
            .unwrap_or_else(|| Arc::new(LopdfDocumentWriter::new().with_pdf_version(self.config.pdf_version.clone())));
        let compositor = Compositor::new(codec, writer).with_options(self.config.compositor_options());

        let (sender, receiver) = async_channel::bounded(self.config.channel_capacity.max(1));
        let state = Arc::new(SessionState::default());
        let task = task::spawn(service::run(compositor, receiver, self.config.timeout(), state.clone()));

        Session { handle: SessionHandle::new(sender, state), task }
    }
}

/// A running session: the task owning the compositor plus a handle to it.
#[derive(Debug)]
pub struct Session {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

impl Session {
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Closes the session and waits for its task to finish. Requests still
    /// waiting for content resolve to [`SessionError::Dropped`].
    pub async fn shutdown(self) -> Result<(), SessionError> {
        self.handle.close();
        self.task.await?;
        Ok(())
    }
}
