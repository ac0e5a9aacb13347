use super::handle::{Command, Composed, SessionState, SessionStatus};
use collate_pdf_composer::{CompositionStatus, CompositionTarget, Compositor};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

/// Owns the compositor for the lifetime of the session and applies commands
/// until every handle is gone, the channel is closed, or the session times
/// out.
pub(crate) async fn run(
    mut compositor: Compositor,
    commands: async_channel::Receiver<Command>,
    timeout: Option<Duration>,
    state: Arc<SessionState>,
) {
    let deadline = timeout.map(|timeout| Instant::now() + timeout);
    info!("[SESSION] Started (timeout: {:?}).", timeout);
    let mut applied = 0usize;

    loop {
        let received = match deadline {
            Some(deadline) => match timeout_at(deadline, commands.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(
                        "[SESSION] Timed out with {} pending requests; discarding the compositor.",
                        compositor.pending_request_count()
                    );
                    state.mark_expired();
                    break;
                }
            },
            None => commands.recv().await,
        };
        let Ok(command) = received else {
            break;
        };
        apply(&mut compositor, command);
        applied += 1;
    }

    commands.close();
    info!("[SESSION] Finished after {} commands ({:?}).", applied, compositor);
}

fn apply(compositor: &mut Compositor, command: Command) {
    match command {
        Command::Register { owner, content_id, target } => {
            compositor.register_reference(owner, content_id, target);
        }
        Command::Submit { frame, content, references, reply } => {
            let _ = reply.send(compositor.submit_content(frame, content, references));
        }
        Command::Unavailable { frame } => compositor.notify_unavailable_frame(frame),
        Command::Compose { root, target, content, references, done } => {
            let on_done = move |status: CompositionStatus, bytes: Vec<u8>| {
                if done.send(Composed { status, bytes }).is_err() {
                    debug!("[SESSION] Composition finished after its receiver was dropped.");
                }
            };
            match target {
                CompositionTarget::Page(page_number) => {
                    compositor.request_page_composition(root, page_number, content, references, on_done);
                }
                CompositionTarget::Document => {
                    compositor.request_document_composition(root, content, references, on_done);
                }
            }
        }
        Command::SetDocumentInfo(info) => compositor.set_document_info(info),
        Command::PrepareDocument { reply } => {
            let _ = reply.send(compositor.prepare_for_document());
        }
        Command::CompleteDocument { page_count, reply, done } => {
            let result = compositor.complete_document(page_count, move |status, bytes| {
                let _ = done.send(Composed { status, bytes });
            });
            let _ = reply.send(result);
        }
        Command::Status { reply } => {
            let _ = reply.send(SessionStatus {
                pending_requests: compositor.pending_request_count(),
                root_frame: compositor.root_frame(),
            });
        }
        Command::FrameReady { frame, reply } => {
            let _ = reply.send(compositor.is_frame_ready(frame));
        }
    }
}
