use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the call contributes the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns a local capture and attaches its tracks.
    Sender,
    /// Expects an inbound stream from the other peer.
    #[default]
    Receiver,
}

impl Role {
    /// Value of the `sendVideo` flag echoed in candidate messages.
    pub fn send_video(self) -> bool {
        matches!(self, Role::Sender)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sender => f.write_str("sender"),
            Role::Receiver => f.write_str("receiver"),
        }
    }
}
