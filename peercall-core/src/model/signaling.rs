use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Messages exchanged with the remote peer through the relay.
///
/// The `type` field selects the shape:
///
/// ```json
/// { "type": "offer", "sdp": "v=0..." }
/// { "type": "candidate", "candidate": null, "sendVideo": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalingMessage {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate(CandidateMessage),
}

/// A trickled ICE candidate. `candidate: None` marks the end of gathering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCandidate", into = "RawCandidate")]
pub struct CandidateMessage {
    pub candidate: Option<IceCandidate>,
    pub send_video: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}

#[derive(Serialize, Deserialize)]
struct RawCandidate {
    candidate: Option<String>,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    sdp_m_line_index: Option<u16>,
    #[serde(rename = "sendVideo", default)]
    send_video: bool,
}

impl From<RawCandidate> for CandidateMessage {
    fn from(raw: RawCandidate) -> Self {
        // An empty string is how some stacks spell the end-of-candidates marker.
        let candidate = raw
            .candidate
            .filter(|c| !c.is_empty())
            .map(|candidate| IceCandidate {
                candidate,
                sdp_mid: raw.sdp_mid,
                sdp_m_line_index: raw.sdp_m_line_index,
            });

        Self {
            candidate,
            send_video: raw.send_video,
        }
    }
}

impl From<CandidateMessage> for RawCandidate {
    fn from(msg: CandidateMessage) -> Self {
        match msg.candidate {
            Some(c) => Self {
                candidate: Some(c.candidate),
                sdp_mid: c.sdp_mid,
                sdp_m_line_index: c.sdp_m_line_index,
                send_video: msg.send_video,
            },
            None => Self {
                candidate: None,
                sdp_mid: None,
                sdp_m_line_index: None,
                send_video: msg.send_video,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("signaling frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("signaling frame is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("signaling message has no `type` field")]
    MissingType,

    #[error("unknown signaling message type `{0}`")]
    UnknownType(String),

    #[error("malformed `{kind}` message: {source}")]
    Malformed {
        kind: String,
        source: serde_json::Error,
    },

    #[error("failed to encode signaling message: {0}")]
    Encode(serde_json::Error),
}

const KNOWN_TYPES: [&str; 3] = ["offer", "answer", "candidate"];

impl SignalingMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalingMessage::Offer { .. } => "offer",
            SignalingMessage::Answer { .. } => "answer",
            SignalingMessage::Candidate(_) => "candidate",
        }
    }

    pub fn to_json(&self) -> Result<String, SignalingError> {
        serde_json::to_string(self).map_err(SignalingError::Encode)
    }

    /// Parse a text frame.
    pub fn decode(text: &str) -> Result<Self, SignalingError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(SignalingError::InvalidJson)?;

        let kind = match value.get("type") {
            Some(serde_json::Value::String(kind)) => kind.clone(),
            Some(other) => return Err(SignalingError::UnknownType(other.to_string())),
            None => return Err(SignalingError::MissingType),
        };

        if !KNOWN_TYPES.contains(&kind.as_str()) {
            return Err(SignalingError::UnknownType(kind));
        }

        serde_json::from_value(value).map_err(|source| SignalingError::Malformed { kind, source })
    }

    /// Parse a binary frame: the payload is UTF-8 JSON text.
    pub fn decode_bytes(data: &[u8]) -> Result<Self, SignalingError> {
        let text = std::str::from_utf8(data)?;
        Self::decode(text)
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod rtc {
    use super::IceCandidate;
    use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

    impl From<IceCandidate> for RTCIceCandidateInit {
        fn from(c: IceCandidate) -> Self {
            RTCIceCandidateInit {
                candidate: c.candidate,
                sdp_mid: c.sdp_mid,
                sdp_mline_index: c.sdp_m_line_index,
                ..Default::default()
            }
        }
    }

    impl From<RTCIceCandidateInit> for IceCandidate {
        fn from(init: RTCIceCandidateInit) -> Self {
            IceCandidate {
                candidate: init.candidate,
                sdp_mid: init.sdp_mid,
                sdp_m_line_index: init.sdp_mline_index,
            }
        }
    }
}
