use crate::media::CapturedMedia;
use crate::session::SessionGuard;
use crate::transport::PeerTransport;
use anyhow::Result;
use peercall_core::{IceCandidate, SessionId};
use tracing::{debug, warn};

/// Who created the session's offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    LocalOffer,
    RemoteOffer,
}

/// Result of handing a remote candidate to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    Applied,
    /// Held until the remote description is set.
    Buffered,
    /// A repeated end-of-candidates marker.
    Ignored,
}

/// The single peer connection of one call attempt. Never reused: a new
/// attempt builds a new session and closes this one.
pub struct NegotiationSession {
    id: SessionId,
    origin: SessionOrigin,
    transport: Box<dyn PeerTransport>,
    guard: SessionGuard,
    /// Keeps the sent capture running while the session uses its tracks.
    media: Option<CapturedMedia>,
    local_description_set: bool,
    remote_description_set: bool,
    end_of_candidates: bool,
    pending: Vec<Option<IceCandidate>>,
    remote_rendered: bool,
}

impl NegotiationSession {
    pub fn new(
        id: SessionId,
        origin: SessionOrigin,
        transport: Box<dyn PeerTransport>,
        guard: SessionGuard,
        media: Option<CapturedMedia>,
    ) -> Self {
        Self {
            id,
            origin,
            transport,
            guard,
            media,
            local_description_set: false,
            remote_description_set: false,
            end_of_candidates: false,
            pending: Vec::new(),
            remote_rendered: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn media(&self) -> Option<&CapturedMedia> {
        self.media.as_ref()
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    pub fn transport(&self) -> &dyn PeerTransport {
        self.transport.as_ref()
    }

    pub fn local_description_set(&self) -> bool {
        self.local_description_set
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote_description_set
    }

    pub fn mark_local_description_set(&mut self) {
        self.local_description_set = true;
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending.len()
    }

    /// Record that the remote description is in place and apply every
    /// candidate that arrived before it, in arrival order.
    pub async fn mark_remote_description_set(&mut self) {
        self.remote_description_set = true;

        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            debug!(
                "Applying {} buffered candidates to session {}",
                pending.len(),
                self.id
            );
        }
        for candidate in pending {
            if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                warn!("Buffered candidate rejected by session {}: {:#}", self.id, e);
            }
        }
    }

    /// Apply a remote candidate, or hold it until the remote description is
    /// set. `None` is passed on at most once per session.
    pub async fn add_remote_candidate(
        &mut self,
        candidate: Option<IceCandidate>,
    ) -> Result<CandidateOutcome> {
        let end_of_candidates = candidate.is_none();
        if end_of_candidates && self.end_of_candidates {
            return Ok(CandidateOutcome::Ignored);
        }

        if !self.remote_description_set {
            self.pending.push(candidate);
            self.end_of_candidates |= end_of_candidates;
            return Ok(CandidateOutcome::Buffered);
        }

        self.transport.add_ice_candidate(candidate).await?;
        self.end_of_candidates |= end_of_candidates;
        Ok(CandidateOutcome::Applied)
    }

    pub fn remote_rendered(&self) -> bool {
        self.remote_rendered
    }

    pub fn mark_remote_rendered(&mut self) {
        self.remote_rendered = true;
    }

    /// Cancel everything spawned for the session and close its transport.
    /// The capture handle is released last.
    pub async fn close(self) {
        self.guard.cancel();
        if let Err(e) = self.transport.close().await {
            warn!("Failed to close session {}: {:#}", self.id, e);
        }
        drop(self.media);
    }
}
