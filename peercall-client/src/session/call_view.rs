use crate::media::{CaptureDevice, CapturedMedia, RemoteStream, TrackSettings};
use crate::session::NegotiationPhase;
use async_trait::async_trait;

/// Where the negotiator shows what happens. Every method is a notification;
/// none of them can fail the call.
#[async_trait]
pub trait CallView: Send + Sync + 'static {
    async fn show_devices(&self, devices: &[CaptureDevice]);

    async fn render_local(&self, media: &CapturedMedia);

    async fn render_remote(&self, stream: RemoteStream);

    async fn resize(&self, settings: TrackSettings);

    /// A user-facing notice: errors, permission hints, lost connections.
    async fn notify_error(&self, message: String);

    async fn phase_changed(&self, phase: NegotiationPhase);
}
