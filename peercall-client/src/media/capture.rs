use crate::error::MediaError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Actual dimensions of a video track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
}

impl fmt::Display for TrackSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if let Some(fps) = self.frame_rate {
            write!(f, "@{:.0}", fps)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDevice {
    pub device_id: String,
    /// Empty when the source hides device names.
    pub label: String,
    pub kind: TrackKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub device_id: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Capture size to request for devices whose label starts with `label_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultResolution {
    pub label_prefix: String,
    pub width: u32,
    pub height: u32,
}

impl CaptureConstraints {
    pub fn for_device(device: &CaptureDevice, defaults: &[DefaultResolution]) -> Self {
        let mut constraints = Self {
            device_id: Some(device.device_id.clone()),
            ..Default::default()
        };

        if let Some(default) = defaults
            .iter()
            .find(|r| device.label.starts_with(&r.label_prefix))
        {
            constraints.width = Some(default.width);
            constraints.height = Some(default.height);
        }

        constraints
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

/// Source of capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn permission(&self) -> PermissionState;

    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, MediaError>;

    async fn acquire(&self, constraints: CaptureConstraints) -> Result<CapturedMedia, MediaError>;
}

/// A VP8 track that samples are written into.
pub(crate) fn vp8_track(track_id: &str, stream_id: &str) -> Arc<TrackLocalStaticSample> {
    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            channels: 0,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        },
        track_id.to_owned(),
        stream_id.to_owned(),
    ))
}

#[derive(Clone)]
pub struct CapturedTrack {
    pub track: Arc<TrackLocalStaticSample>,
    pub kind: TrackKind,
    pub settings: Option<TrackSettings>,
}

struct CapturedInner {
    stream_id: String,
    device: CaptureDevice,
    tracks: Vec<CapturedTrack>,
    stop_tx: watch::Sender<bool>,
}

impl Drop for CapturedInner {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

/// A running local capture. Clones share the same tracks; the capture stops
/// once the last clone is dropped.
#[derive(Clone)]
pub struct CapturedMedia {
    inner: Arc<CapturedInner>,
}

impl CapturedMedia {
    /// Returns the media and a receiver that flips to `true` when the last
    /// handle is dropped. Sample pumps watch it to know when to stop.
    pub fn new(
        stream_id: impl Into<String>,
        device: CaptureDevice,
        tracks: Vec<CapturedTrack>,
    ) -> (Self, watch::Receiver<bool>) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let media = Self {
            inner: Arc::new(CapturedInner {
                stream_id: stream_id.into(),
                device,
                tracks,
                stop_tx,
            }),
        };
        (media, stop_rx)
    }

    pub fn stream_id(&self) -> &str {
        &self.inner.stream_id
    }

    pub fn device(&self) -> &CaptureDevice {
        &self.inner.device
    }

    pub fn tracks(&self) -> &[CapturedTrack] {
        &self.inner.tracks
    }

    /// Settings of the first video track.
    pub fn video_settings(&self) -> Option<TrackSettings> {
        self.inner
            .tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Video)
            .find_map(|t| t.settings)
    }
}

impl fmt::Debug for CapturedMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedMedia")
            .field("stream_id", &self.inner.stream_id)
            .field("device", &self.inner.device.label)
            .field("tracks", &self.inner.tracks.len())
            .finish()
    }
}
