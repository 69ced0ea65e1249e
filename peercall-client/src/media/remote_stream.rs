use std::fmt;

use tokio::sync::{broadcast, watch};
use tracing::info;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::rtp::packet::Packet;

use crate::media::{TrackKind, TrackSettings, vp8};

const PACKET_BUFFER: usize = 512;

/// An inbound track handed to the view for rendering.
#[derive(Clone)]
pub struct RemoteStream {
    stream_id: String,
    track_id: String,
    kind: TrackKind,
    packets: broadcast::Sender<Packet>,
    settings: watch::Receiver<Option<TrackSettings>>,
}

/// Producer side of a [`RemoteStream`], fed by the transport's reader task.
pub struct RemoteFeed {
    track_id: String,
    sniff_vp8: bool,
    packets: broadcast::Sender<Packet>,
    settings: watch::Sender<Option<TrackSettings>>,
}

impl RemoteStream {
    pub fn new(
        stream_id: impl Into<String>,
        track_id: impl Into<String>,
        kind: TrackKind,
        mime_type: &str,
    ) -> (Self, RemoteFeed) {
        let track_id = track_id.into();
        let (packets, _) = broadcast::channel(PACKET_BUFFER);
        let (settings_tx, settings_rx) = watch::channel(None);

        let stream = Self {
            stream_id: stream_id.into(),
            track_id: track_id.clone(),
            kind,
            packets: packets.clone(),
            settings: settings_rx,
        };
        let feed = RemoteFeed {
            track_id,
            sniff_vp8: kind == TrackKind::Video && mime_type.eq_ignore_ascii_case(MIME_TYPE_VP8),
            packets,
            settings: settings_tx,
        };
        (stream, feed)
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// RTP packets received from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Packet> {
        self.packets.subscribe()
    }

    /// Dimensions learnt from the most recent key frame, if any.
    pub fn settings(&self) -> Option<TrackSettings> {
        *self.settings.borrow()
    }

    /// Wait until dimensions are known. `None` if the track ended first.
    pub async fn wait_for_settings(&self) -> Option<TrackSettings> {
        let mut rx = self.settings.clone();
        rx.wait_for(Option::is_some).await.ok().and_then(|s| *s)
    }
}

impl fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStream")
            .field("stream_id", &self.stream_id)
            .field("track_id", &self.track_id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl RemoteFeed {
    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    /// Publish a packet. Returns the new settings when this packet changed
    /// the known dimensions.
    pub fn push(&self, packet: Packet) -> Option<TrackSettings> {
        let learnt = if self.sniff_vp8 {
            vp8::packet_dimensions(&packet.payload).filter(|s| {
                let changed = self.settings.borrow().is_none_or(|known| {
                    known.width != s.width || known.height != s.height
                });
                if changed {
                    info!("Remote track {} is {}x{}", self.track_id, s.width, s.height);
                    self.settings.send_replace(Some(*s));
                }
                changed
            })
        } else {
            None
        };

        // No subscribers is fine; the packet is simply not rendered.
        let _ = self.packets.send(packet);
        learnt
    }
}
