use bytes::Bytes;
use webrtc::rtp::codecs::vp8::Vp8Packet;
use webrtc::rtp::packetizer::Depacketizer;

use crate::media::TrackSettings;

const KEYFRAME_START_CODE: [u8; 3] = [0x9d, 0x01, 0x2a];

/// Width and height from the uncompressed header of a VP8 key frame
/// (RFC 6386, 9.1). Returns `None` for inter frames.
pub fn keyframe_dimensions(frame: &[u8]) -> Option<(u32, u32)> {
    if frame.len() < 10 || frame[0] & 0x01 != 0 || frame[3..6] != KEYFRAME_START_CODE {
        return None;
    }

    // Top two bits of each field are the scaling mode.
    let width = u16::from_le_bytes([frame[6], frame[7]]) & 0x3fff;
    let height = u16::from_le_bytes([frame[8], frame[9]]) & 0x3fff;

    Some((u32::from(width), u32::from(height)))
}

/// Dimensions carried by an RTP VP8 payload, if it starts a key frame.
pub fn packet_dimensions(payload: &Bytes) -> Option<TrackSettings> {
    let mut depacketizer = Vp8Packet::default();
    let frame = depacketizer.depacketize(payload).ok()?;

    if depacketizer.s != 1 || depacketizer.pid != 0 {
        return None;
    }

    keyframe_dimensions(&frame).map(|(width, height)| TrackSettings {
        width,
        height,
        frame_rate: None,
    })
}
