mod role;
mod session;
mod signaling;

pub use role::Role;
pub use session::SessionId;
pub use signaling::{
    CandidateMessage, IceCandidate, IceServerConfig, SignalingError, SignalingMessage,
};
