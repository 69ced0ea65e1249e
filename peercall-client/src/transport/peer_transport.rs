use crate::media::{CapturedTrack, TrackSettings};
use crate::session::SessionGuard;
use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use peercall_core::{IceCandidate, Role, SessionId};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpKind::Offer => f.write_str("offer"),
            SdpKind::Answer => f.write_str("answer"),
        }
    }
}

/// One peer connection. Creating a description does not commit it;
/// the negotiator calls [`set_local_description`](Self::set_local_description)
/// separately so it controls the order relative to sending.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> Result<String>;

    async fn create_answer(&self) -> Result<String>;

    async fn set_local_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn add_track(&self, track: &CapturedTrack) -> Result<()>;

    /// `None` signals end-of-candidates.
    async fn add_ice_candidate(&self, candidate: Option<IceCandidate>) -> Result<()>;

    /// Settings of the first video transceiver's receiving track, falling
    /// back to its sending track.
    async fn video_settings(&self) -> Result<Option<TrackSettings>>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Build a transport whose callbacks report to `events`, tagged with
    /// `session`, until `guard` is cancelled.
    async fn create(
        &self,
        session: SessionId,
        role: Role,
        guard: SessionGuard,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}
