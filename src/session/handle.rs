use crate::error::SessionError;
use collate_pdf_composer::{ComposerError, CompositionStatus, CompositionTarget, SharedContent};
use collate_render_core::DocumentInfo;
use collate_types::{ContentId, FrameId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;

/// The outcome of one composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub status: CompositionStatus,
    pub bytes: Vec<u8>,
}

impl Composed {
    pub fn has_output(&self) -> bool {
        self.status.has_output()
    }
}

/// A snapshot of the session's compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub pending_requests: usize,
    pub root_frame: Option<FrameId>,
}

pub(crate) type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Command {
    Register {
        owner: FrameId,
        content_id: ContentId,
        target: FrameId,
    },
    Submit {
        frame: FrameId,
        content: SharedContent,
        references: Vec<ContentId>,
        reply: Reply<Result<(), ComposerError>>,
    },
    Unavailable {
        frame: FrameId,
    },
    Compose {
        root: FrameId,
        target: CompositionTarget,
        content: SharedContent,
        references: Vec<ContentId>,
        done: Reply<Composed>,
    },
    SetDocumentInfo(DocumentInfo),
    PrepareDocument {
        reply: Reply<Result<(), ComposerError>>,
    },
    CompleteDocument {
        page_count: u32,
        reply: Reply<Result<(), ComposerError>>,
        done: Reply<Composed>,
    },
    Status {
        reply: Reply<SessionStatus>,
    },
    FrameReady {
        frame: FrameId,
        reply: Reply<bool>,
    },
}

/// Shared between the handles and the session task.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    expired: AtomicBool,
}

impl SessionState {
    pub(crate) fn mark_expired(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    fn closed(&self) -> SessionError {
        if self.is_expired() { SessionError::Expired } else { SessionError::Closed }
    }

    fn dropped(&self) -> SessionError {
        if self.is_expired() { SessionError::Expired } else { SessionError::Dropped }
    }
}

/// A composition that was handed to the session and has not necessarily
/// been fulfilled yet.
#[derive(Debug)]
pub struct PendingComposition {
    receiver: oneshot::Receiver<Composed>,
    state: Arc<SessionState>,
}

impl PendingComposition {
    /// Waits until the compositor fulfills the request.
    pub async fn wait(self) -> Result<Composed, SessionError> {
        self.receiver.await.map_err(|_| self.state.dropped())
    }
}

/// A cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: async_channel::Sender<Command>,
    state: Arc<SessionState>,
}

impl SessionHandle {
    pub(crate) fn new(commands: async_channel::Sender<Command>, state: Arc<SessionState>) -> Self {
        Self { commands, state }
    }

    pub async fn register_reference(
        &self,
        owner: FrameId,
        content_id: ContentId,
        target: FrameId,
    ) -> Result<(), SessionError> {
        self.send(Command::Register { owner, content_id, target }).await
    }

    /// Submits a frame's recording. Fails with
    /// [`ComposerError::ContentAlreadySubmitted`] if the frame already has
    /// content.
    pub async fn submit_content<C, R>(&self, frame: FrameId, content: C, references: R) -> Result<(), SessionError>
    where
        C: Into<SharedContent>,
        R: IntoIterator<Item = ContentId>,
    {
        let (reply, receiver) = oneshot::channel();
        let references = references.into_iter().collect();
        self.send(Command::Submit { frame, content: content.into(), references, reply }).await?;
        Ok(self.receive(receiver).await??)
    }

    pub async fn notify_unavailable_frame(&self, frame: FrameId) -> Result<(), SessionError> {
        self.send(Command::Unavailable { frame }).await
    }

    pub async fn compose_page<C, R>(
        &self,
        root: FrameId,
        page_number: u32,
        content: C,
        references: R,
    ) -> Result<PendingComposition, SessionError>
    where
        C: Into<SharedContent>,
        R: IntoIterator<Item = ContentId>,
    {
        self.compose(root, CompositionTarget::Page(page_number), content.into(), references.into_iter().collect())
            .await
    }

    pub async fn compose_document<C, R>(
        &self,
        root: FrameId,
        content: C,
        references: R,
    ) -> Result<PendingComposition, SessionError>
    where
        C: Into<SharedContent>,
        R: IntoIterator<Item = ContentId>,
    {
        self.compose(root, CompositionTarget::Document, content.into(), references.into_iter().collect()).await
    }

    pub async fn set_document_info(&self, info: DocumentInfo) -> Result<(), SessionError> {
        self.send(Command::SetDocumentInfo(info)).await
    }

    pub async fn prepare_for_document(&self) -> Result<(), SessionError> {
        let (reply, receiver) = oneshot::channel();
        self.send(Command::PrepareDocument { reply }).await?;
        Ok(self.receive(receiver).await??)
    }

    /// Asks for the collected pages as one document once `page_count`
    /// pages have been composed.
    pub async fn complete_document(&self, page_count: u32) -> Result<PendingComposition, SessionError> {
        let (reply, receiver) = oneshot::channel();
        let (done, pending) = oneshot::channel();
        self.send(Command::CompleteDocument { page_count, reply, done }).await?;
        self.receive(receiver).await??;
        Ok(PendingComposition { receiver: pending, state: self.state.clone() })
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        let (reply, receiver) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        self.receive(receiver).await
    }

    pub async fn is_frame_ready(&self, frame: FrameId) -> Result<bool, SessionError> {
        let (reply, receiver) = oneshot::channel();
        self.send(Command::FrameReady { frame, reply }).await?;
        self.receive(receiver).await
    }

    /// Stops accepting commands. Commands already queued are still applied.
    pub fn close(&self) -> bool {
        self.commands.close()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn compose(
        &self,
        root: FrameId,
        target: CompositionTarget,
        content: SharedContent,
        references: Vec<ContentId>,
    ) -> Result<PendingComposition, SessionError> {
        let (done, receiver) = oneshot::channel();
        self.send(Command::Compose { root, target, content, references, done }).await?;
        Ok(PendingComposition { receiver, state: self.state.clone() })
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands.send(command).await.map_err(|_| self.state.closed())
    }

    async fn receive<T>(&self, receiver: oneshot::Receiver<T>) -> Result<T, SessionError> {
        receiver.await.map_err(|_| self.state.dropped())
    }
}
