use crate::media::RemoteStream;
use peercall_core::{IceCandidate, SessionId};
use std::fmt;

/// Connection state as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Callbacks of a transport, tagged with the session that created it.
#[derive(Debug)]
pub enum TransportEvent {
    /// A locally gathered candidate. `None` once gathering is complete.
    CandidateGathered(SessionId, Option<IceCandidate>),
    RemoteTrack(SessionId, RemoteStream),
    StateChanged(SessionId, ConnectionState),
}

impl TransportEvent {
    pub fn session(&self) -> SessionId {
        match self {
            TransportEvent::CandidateGathered(id, _)
            | TransportEvent::RemoteTrack(id, _)
            | TransportEvent::StateChanged(id, _) => *id,
        }
    }
}
