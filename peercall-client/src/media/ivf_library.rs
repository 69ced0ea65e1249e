use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;
use webrtc::media::Sample;
use webrtc::media::io::ivf_reader::{IVFFileHeader, IVFReader};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::MediaError;
use crate::media::capture::vp8_track;
use crate::media::{
    CaptureConstraints, CaptureDevice, CapturedMedia, CapturedTrack, MediaDevices,
    PermissionState, TrackKind, TrackSettings,
};

const VP8_FOURCC: &[u8; 4] = b"VP80";

/// A directory of VP8 `.ivf` recordings, each exposed as one capture device.
/// Frames are paced at the file's own frame rate and loop at end of file.
pub struct IvfLibrary {
    dir: PathBuf,
}

impl IvfLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn open(path: &Path) -> Result<(IVFReader<BufReader<File>>, IVFFileHeader), MediaError> {
        let file = File::open(path).map_err(|e| MediaError::io(path, e))?;
        IVFReader::new(BufReader::new(file)).map_err(|e| MediaError::Unsupported {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MediaDevices for IvfLibrary {
    async fn permission(&self) -> PermissionState {
        match tokio::fs::read_dir(&self.dir).await {
            Ok(_) => PermissionState::Granted,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => PermissionState::Denied,
            Err(_) => PermissionState::Prompt,
        }
    }

    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, MediaError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| MediaError::io(&self.dir, e))?;

        let mut devices = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MediaError::io(&self.dir, e))?
        {
            let path = entry.path();
            let is_ivf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ivf"));
            if !is_ivf {
                continue;
            }

            let label = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            devices.push(CaptureDevice {
                device_id: path.display().to_string(),
                label,
                kind: TrackKind::Video,
            });
        }

        devices.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(devices)
    }

    async fn acquire(&self, constraints: CaptureConstraints) -> Result<CapturedMedia, MediaError> {
        let devices = self.enumerate_devices().await?;
        let device = match &constraints.device_id {
            Some(id) => devices
                .into_iter()
                .find(|d| &d.device_id == id)
                .ok_or_else(|| MediaError::DeviceNotFound(id.clone()))?,
            None => devices.into_iter().next().ok_or(MediaError::NoDevices)?,
        };

        let path = PathBuf::from(&device.device_id);
        let (_, header) = Self::open(&path)?;
        if &header.four_cc != VP8_FOURCC {
            return Err(MediaError::Unsupported {
                path,
                reason: format!(
                    "codec {} is not VP8",
                    String::from_utf8_lossy(&header.four_cc)
                ),
            });
        }

        let frame_rate = if header.timebase_numerator == 0 {
            30.0
        } else {
            f64::from(header.timebase_denominator) / f64::from(header.timebase_numerator)
        };
        let settings = TrackSettings {
            width: u32::from(header.width),
            height: u32::from(header.height),
            frame_rate: Some(frame_rate),
        };

        if let (Some(w), Some(h)) = (constraints.width, constraints.height) {
            if (w, h) != (settings.width, settings.height) {
                debug!(
                    "Requested {}x{} but {} is recorded at {}",
                    w, h, device.label, settings
                );
            }
        }

        let stream_id = Uuid::new_v4().to_string();
        let track = vp8_track("video", &stream_id);
        let (media, stop_rx) = CapturedMedia::new(
            stream_id,
            device.clone(),
            vec![CapturedTrack {
                track: track.clone(),
                kind: TrackKind::Video,
                settings: Some(settings),
            }],
        );

        info!("Capturing {} at {}", device.label, settings);
        let interval = Duration::from_secs_f64(1.0 / frame_rate.max(1.0));
        tokio::spawn(pump_frames(path, track, interval, stop_rx));

        Ok(media)
    }
}

async fn pump_frames(
    path: PathBuf,
    track: Arc<TrackLocalStaticSample>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let mut reader = match IvfLibrary::open(&path) {
            Ok((reader, _)) => reader,
            Err(e) => {
                warn!("Stopping capture of {}: {}", path.display(), e);
                return;
            }
        };

        let mut ticker = tokio::time::interval(interval);
        let mut frames = 0usize;

        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    debug!("Capture of {} stopped", path.display());
                    return;
                }
                _ = ticker.tick() => {}
            }

            let frame = match reader.parse_next_frame() {
                Ok((frame, _)) => frame,
                Err(_) => break,
            };
            frames += 1;

            let sample = Sample {
                data: frame.freeze(),
                duration: interval,
                ..Default::default()
            };
            if let Err(e) = track.write_sample(&sample).await {
                debug!("Dropped frame from {}: {}", path.display(), e);
            }
        }

        if frames == 0 {
            warn!("{} contains no frames", path.display());
            return;
        }
        debug!("Looping {} after {} frames", path.display(), frames);
    }
}
