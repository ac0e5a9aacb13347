//! Job manifests: a recorded sequence of transport events that can be
//! replayed into a session.
//!
//! ```json
//! {
//!   "document_info": { "title": "Embedded report" },
//!   "events": [
//!     { "event": "register", "owner": 1, "content_id": 7, "target": 2 },
//!     { "event": "submit", "frame": 2, "recording": { "pages": [ ... ] } },
//!     { "event": "compose_document", "root": 1, "recording": { "pages": [ ... ] } }
//!   ]
//! }
//! ```
//!
//! When `references` is left out of an event, the placeholder ids found in
//! its recording are used.

use crate::error::SessionError;
use crate::session::{Composed, PendingComposition, SessionHandle};
use collate_pdf_composer::CompositionTarget;
use collate_render_core::{DocumentInfo, Recording};
use collate_types::{ContentId, FrameId};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobManifest {
    #[serde(default)]
    pub document_info: Option<DocumentInfo>,
    /// Collect every composed page and assemble them into one document at
    /// the end of the replay.
    #[serde(default)]
    pub assemble_pages: bool,
    pub events: Vec<JobEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Register {
        owner: FrameId,
        content_id: ContentId,
        target: FrameId,
    },
    Submit {
        frame: FrameId,
        recording: Recording,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        references: Option<Vec<ContentId>>,
    },
    Unavailable {
        frame: FrameId,
    },
    ComposePage {
        root: FrameId,
        page_number: u32,
        recording: Recording,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        references: Option<Vec<ContentId>>,
    },
    ComposeDocument {
        root: FrameId,
        recording: Recording,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        references: Option<Vec<ContentId>>,
    },
}

/// What a replay produced, in the order the composition events appeared.
#[derive(Debug, Default)]
pub struct ReplayOutcome {
    pub compositions: Vec<(CompositionTarget, Composed)>,
    /// The assembled document when the manifest asked for one.
    pub document: Option<Composed>,
    pub rejected_submissions: usize,
    /// Compositions (the assembled document included) whose dependencies
    /// never arrived before the session wound down.
    pub unfulfilled: usize,
}

impl ReplayOutcome {
    /// The result worth writing out: the assembled document, else the last
    /// whole-document composition, else the last page.
    pub fn final_output(&self) -> Option<&Composed> {
        self.document.as_ref().or_else(|| {
            self.compositions
                .iter()
                .rev()
                .find(|(target, _)| *target == CompositionTarget::Document)
                .or_else(|| self.compositions.last())
                .map(|(_, composed)| composed)
        })
    }
}

impl JobManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn from_json(source: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Distinct page numbers; the compositor collects one page per number.
    fn page_count(&self) -> u32 {
        self.events
            .iter()
            .filter_map(|event| match event {
                JobEvent::ComposePage { page_number, .. } => Some(*page_number),
                _ => None,
            })
            .collect::<BTreeSet<u32>>()
            .len() as u32
    }

    /// Feeds every event into the session, closes it, then waits for all
    /// the compositions it started.
    ///
    /// Compositions are not awaited while replaying, since a request may
    /// only be satisfiable by events further down the manifest. Closing the
    /// session once everything is sent lets it drain the queue and shut
    /// down, so compositions that can never be satisfied are counted as
    /// unfulfilled instead of waited on forever.
    pub async fn replay(&self, session: &SessionHandle) -> Result<ReplayOutcome, SessionError> {
        if let Some(info) = &self.document_info {
            session.set_document_info(info.clone()).await?;
        }
        if self.assemble_pages {
            session.prepare_for_document().await?;
        }

        let mut outcome = ReplayOutcome::default();
        let mut pending: Vec<(CompositionTarget, PendingComposition)> = Vec::new();

        for event in &self.events {
            match event {
                JobEvent::Register { owner, content_id, target } => {
                    session.register_reference(*owner, *content_id, *target).await?;
                }
                JobEvent::Submit { frame, recording, references } => {
                    let references = references_for(recording, references);
                    match session.submit_content(*frame, recording.to_bytes().map_err(codec_error)?, references).await {
                        Ok(()) => {}
                        Err(SessionError::Composer(err)) => {
                            warn!("[SESSION] Skipping submission: {}", err);
                            outcome.rejected_submissions += 1;
                        }
                        Err(err) => return Err(err),
                    }
                }
                JobEvent::Unavailable { frame } => session.notify_unavailable_frame(*frame).await?,
                JobEvent::ComposePage { root, page_number, recording, references } => {
                    let references = references_for(recording, references);
                    let bytes = recording.to_bytes().map_err(codec_error)?;
                    let request = session.compose_page(*root, *page_number, bytes, references).await?;
                    pending.push((CompositionTarget::Page(*page_number), request));
                }
                JobEvent::ComposeDocument { root, recording, references } => {
                    let references = references_for(recording, references);
                    let bytes = recording.to_bytes().map_err(codec_error)?;
                    let request = session.compose_document(*root, bytes, references).await?;
                    pending.push((CompositionTarget::Document, request));
                }
            }
        }

        let document = if self.assemble_pages {
            Some(session.complete_document(self.page_count()).await?)
        } else {
            None
        };
        session.close();

        for (target, request) in pending {
            match settle(request).await? {
                Some(composed) => outcome.compositions.push((target, composed)),
                None => {
                    warn!("[SESSION] {:?} composition was never fulfilled.", target);
                    outcome.unfulfilled += 1;
                }
            }
        }
        if let Some(document) = document {
            outcome.document = settle(document).await?;
            if outcome.document.is_none() {
                warn!("[SESSION] Assembled document was never fulfilled.");
                outcome.unfulfilled += 1;
            }
        }

        info!(
            "[SESSION] Replayed {} events into {} compositions.",
            self.events.len(),
            outcome.compositions.len()
        );
        Ok(outcome)
    }
}

/// Waits for a composition; `None` when the session dropped it unfulfilled.
async fn settle(request: PendingComposition) -> Result<Option<Composed>, SessionError> {
    match request.wait().await {
        Ok(composed) => Ok(Some(composed)),
        Err(SessionError::Dropped) => Ok(None),
        Err(err) => Err(err),
    }
}

fn references_for(recording: &Recording, explicit: &Option<Vec<ContentId>>) -> Vec<ContentId> {
    match explicit {
        Some(references) => references.clone(),
        None => recording.placeholder_ids().into_iter().collect(),
    }
}

fn codec_error(err: collate_render_core::CodecError) -> SessionError {
    SessionError::Composer(err.into())
}
