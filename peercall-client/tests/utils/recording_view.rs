use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use peercall_client::media::{CaptureDevice, CapturedMedia, RemoteStream, TrackSettings};
use peercall_client::{CallView, NegotiationPhase};
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub enum ViewEvent {
    Devices(Vec<CaptureDevice>),
    Local(String),
    Remote(RemoteStream),
    Resize(TrackSettings),
    Error(String),
    Phase(NegotiationPhase),
}

/// A view that remembers everything it was asked to show.
#[derive(Clone)]
pub struct RecordingView {
    events: Arc<Mutex<Vec<ViewEvent>>>,
    phase_tx: Arc<watch::Sender<NegotiationPhase>>,
    changed_tx: Arc<watch::Sender<usize>>,
}

impl RecordingView {
    pub fn new() -> Self {
        let (phase_tx, _) = watch::channel(NegotiationPhase::Idle);
        let (changed_tx, _) = watch::channel(0);
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            phase_tx: Arc::new(phase_tx),
            changed_tx: Arc::new(changed_tx),
        }
    }

    fn push(&self, event: ViewEvent) {
        let mut events = self.events.lock().unwrap();
        events.push(event);
        self.changed_tx.send_replace(events.len());
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Error(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn resizes(&self) -> Vec<TrackSettings> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Resize(settings) => Some(settings),
                _ => None,
            })
            .collect()
    }

    pub fn remotes(&self) -> Vec<RemoteStream> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Remote(stream) => Some(stream),
                _ => None,
            })
            .collect()
    }

    pub fn phase(&self) -> NegotiationPhase {
        *self.phase_tx.borrow()
    }

    pub async fn wait_for_phase(&self, phase: NegotiationPhase, timeout_ms: u64) -> bool {
        let mut rx = self.phase_tx.subscribe();
        tokio::time::timeout(Duration::from_millis(timeout_ms), rx.wait_for(|p| *p == phase))
            .await
            .is_ok_and(|r| r.is_ok())
    }

    /// Wait until some recorded event satisfies `pred`.
    pub async fn wait_for(&self, pred: impl Fn(&ViewEvent) -> bool, timeout_ms: u64) -> bool {
        let mut rx = self.changed_tx.subscribe();
        let found = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            loop {
                if self.events().iter().any(&pred) {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;
        found.is_ok() && self.events().iter().any(&pred)
    }
}

#[async_trait]
impl CallView for RecordingView {
    async fn show_devices(&self, devices: &[CaptureDevice]) {
        self.push(ViewEvent::Devices(devices.to_vec()));
    }

    async fn render_local(&self, media: &CapturedMedia) {
        self.push(ViewEvent::Local(media.device().label.clone()));
    }

    async fn render_remote(&self, stream: RemoteStream) {
        self.push(ViewEvent::Remote(stream));
    }

    async fn resize(&self, settings: TrackSettings) {
        self.push(ViewEvent::Resize(settings));
    }

    async fn notify_error(&self, message: String) {
        self.push(ViewEvent::Error(message));
    }

    async fn phase_changed(&self, phase: NegotiationPhase) {
        self.phase_tx.send_replace(phase);
        self.push(ViewEvent::Phase(phase));
    }
}
