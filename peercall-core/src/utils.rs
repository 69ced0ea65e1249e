pub const DEFAULT_STUN_ADDR: &str = "stun:stun.comame.dev:3478";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun.l.google.com:19302";

/// Path the relay serves its WebSocket endpoint on.
pub const SIGNALING_PATH: &str = "/signaling";

pub const DEFAULT_RELAY_URL: &str = "wss://webrtc.comame.dev/signaling";
