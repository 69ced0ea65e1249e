use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;
use webrtc::media::Sample;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::MediaError;
use crate::media::capture::vp8_track;
use crate::media::{
    CaptureConstraints, CaptureDevice, CapturedMedia, CapturedTrack, MediaDevices,
    PermissionState, TrackKind, TrackSettings,
};

/// A single fake camera producing blank VP8 key frames.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    device: CaptureDevice,
    settings: TrackSettings,
    permission: PermissionState,
}

impl SyntheticCamera {
    pub fn new(label: impl Into<String>, settings: TrackSettings) -> Self {
        Self {
            device: CaptureDevice {
                device_id: "synthetic-0".to_owned(),
                label: label.into(),
                kind: TrackKind::Video,
            },
            settings,
            permission: PermissionState::Granted,
        }
    }

    pub fn with_permission(mut self, permission: PermissionState) -> Self {
        self.permission = permission;
        self
    }

    pub fn device(&self) -> &CaptureDevice {
        &self.device
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(
            "Synthetic Camera",
            TrackSettings {
                width: 640,
                height: 480,
                frame_rate: Some(15.0),
            },
        )
    }
}

#[async_trait]
impl MediaDevices for SyntheticCamera {
    async fn permission(&self) -> PermissionState {
        self.permission
    }

    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, MediaError> {
        if self.permission == PermissionState::Denied {
            return Err(MediaError::PermissionDenied);
        }
        Ok(vec![self.device.clone()])
    }

    async fn acquire(&self, constraints: CaptureConstraints) -> Result<CapturedMedia, MediaError> {
        if self.permission == PermissionState::Denied {
            return Err(MediaError::PermissionDenied);
        }
        let requested = constraints.device_id.as_ref();
        if let Some(id) = requested.filter(|id| **id != self.device.device_id) {
            return Err(MediaError::DeviceNotFound(id.clone()));
        }

        let mut settings = self.settings;
        if let (Some(width), Some(height)) = (constraints.width, constraints.height) {
            settings.width = width;
            settings.height = height;
        }

        let stream_id = Uuid::new_v4().to_string();
        let track = vp8_track("video", &stream_id);
        let (media, stop_rx) = CapturedMedia::new(
            stream_id,
            self.device.clone(),
            vec![CapturedTrack {
                track: track.clone(),
                kind: TrackKind::Video,
                settings: Some(settings),
            }],
        );

        tokio::spawn(pump_blank_frames(track, settings, stop_rx));
        Ok(media)
    }
}

/// Smallest frame that still carries the key frame header.
fn blank_keyframe(width: u32, height: u32) -> Bytes {
    let w = (width.min(0x3fff) as u16).to_le_bytes();
    let h = (height.min(0x3fff) as u16).to_le_bytes();
    Bytes::from(vec![
        0x50, 0x01, 0x00, 0x9d, 0x01, 0x2a, w[0], w[1], h[0], h[1], 0x00, 0x00,
    ])
}

async fn pump_blank_frames(
    track: Arc<TrackLocalStaticSample>,
    settings: TrackSettings,
    mut stop_rx: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs_f64(1.0 / settings.frame_rate.unwrap_or(15.0).max(1.0));
    let frame = blank_keyframe(settings.width, settings.height);
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        let sample = Sample {
            data: frame.clone(),
            duration: interval,
            ..Default::default()
        };
        if let Err(e) = track.write_sample(&sample).await {
            debug!("Synthetic frame dropped: {}", e);
        }
    }

    debug!("Synthetic capture stopped");
}
