use crate::config::{CallConfig, DescriptionOrder};
use crate::error::{MediaError, NegotiationError};
use crate::media::{CaptureConstraints, MediaDevices, PermissionState, TrackSettings};
use crate::relay::{RelayFrame, RelaySender};
use crate::session::{
    CallCommand, CallView, CandidateOutcome, CapabilityRole, NegotiationSession, SessionGuard,
    SessionOrigin,
};
use crate::transport::{ConnectionState, SdpKind, TransportEvent, TransportFactory};
use peercall_core::{CandidateMessage, Role, SessionId, SignalingMessage};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

/// Coarse progress of the current call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    Idle,
    Negotiating,
    Connected,
}

impl fmt::Display for NegotiationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationPhase::Idle => f.write_str("idle"),
            NegotiationPhase::Negotiating => f.write_str("negotiating"),
            NegotiationPhase::Connected => f.write_str("connected"),
        }
    }
}

/// Sends [`CallCommand`]s to a spawned [`Negotiator`].
#[derive(Debug, Clone)]
pub struct CallHandle {
    tx: mpsc::Sender<CallCommand>,
}

impl CallHandle {
    /// Returns `false` once the negotiator has stopped.
    pub async fn send(&self, cmd: CallCommand) -> bool {
        self.tx.send(cmd).await.is_ok()
    }

    pub async fn start_capture(&self, device_id: Option<String>) -> bool {
        self.send(CallCommand::StartCapture { device_id }).await
    }

    pub async fn start_call(&self) -> bool {
        self.send(CallCommand::StartCall).await
    }

    pub async fn adjust_resolution(&self) -> bool {
        self.send(CallCommand::AdjustResolution).await
    }

    pub async fn shutdown(&self) -> bool {
        self.send(CallCommand::Shutdown).await
    }
}

/// Owns the one live call session and drives the offer/answer/candidate
/// exchange over the relay.
pub struct Negotiator {
    config: CallConfig,
    relay: RelaySender,
    transports: Arc<dyn TransportFactory>,
    devices: Arc<dyn MediaDevices>,
    view: Arc<dyn CallView>,
    capability: CapabilityRole,
    session: Option<NegotiationSession>,
    phase: NegotiationPhase,
    event_tx: mpsc::Sender<TransportEvent>,
    event_rx: mpsc::Receiver<TransportEvent>,
}

impl Negotiator {
    pub fn new(
        config: CallConfig,
        relay: RelaySender,
        transports: Arc<dyn TransportFactory>,
        devices: Arc<dyn MediaDevices>,
        view: Arc<dyn CallView>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        Self {
            config,
            relay,
            transports,
            devices,
            view,
            capability: CapabilityRole::default(),
            session: None,
            phase: NegotiationPhase::Idle,
            event_tx,
            event_rx,
        }
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    pub fn role(&self) -> Role {
        self.capability.role()
    }

    pub fn session(&self) -> Option<&NegotiationSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(NegotiationSession::id)
    }

    /// Next event reported by a transport. Only needed when driving the
    /// negotiator by hand instead of through [`run`](Self::run).
    pub async fn next_transport_event(&mut self) -> Option<TransportEvent> {
        self.event_rx.recv().await
    }

    /// Run the event loop on its own task.
    pub fn spawn(
        self,
        inbound: mpsc::UnboundedReceiver<RelayFrame>,
    ) -> (CallHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(self.run(rx, inbound));
        (CallHandle { tx }, task)
    }

    pub async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<CallCommand>,
        mut inbound: mpsc::UnboundedReceiver<RelayFrame>,
    ) {
        info!("Negotiator event loop started");
        self.probe_devices().await;

        let mut relay_open = true;

        loop {
            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(CallCommand::Shutdown) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down negotiator.");
                            break;
                        }
                    }
                }

                frame = inbound.recv(), if relay_open => {
                    match frame {
                        Some(f) => {
                            if let Err(e) = self.handle_inbound(&f).await {
                                self.report(e).await;
                            }
                        }
                        None => {
                            warn!("Relay channel closed");
                            relay_open = false;
                            self.view
                                .notify_error("Lost connection to the relay".to_owned())
                                .await;
                        }
                    }
                }

                Some(evt) = self.event_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }
            }
        }

        if let Some(session) = self.session.take() {
            session.close().await;
        }
        info!("Negotiator event loop finished");
    }

    async fn handle_command(&mut self, cmd: CallCommand) {
        let result = match cmd {
            CallCommand::StartCapture { device_id } => {
                self.start_capture(device_id.as_deref()).await.map(|_| ())
            }
            CallCommand::StartCall => self.start_call().await.map(|_| ()),
            CallCommand::AdjustResolution => self.adjust_resolution().await.map(|_| ()),
            CallCommand::Shutdown => Ok(()),
        };

        if let Err(e) = result {
            self.report(e).await;
        }
    }

    async fn report(&self, error: NegotiationError) {
        warn!("{}", error);
        self.view.notify_error(error.to_string()).await;
    }

    async fn set_phase(&mut self, phase: NegotiationPhase) {
        if self.phase == phase {
            return;
        }
        info!("Call phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.view.phase_changed(phase).await;
    }

    /// Check capture permission and list devices to the view.
    pub async fn probe_devices(&self) {
        let permission = self.devices.permission().await;
        match permission {
            PermissionState::Denied => {
                self.view
                    .notify_error("Allow camera access to capture video".to_owned())
                    .await;
            }
            PermissionState::Prompt => {
                self.view
                    .notify_error("Press capture to grant camera access".to_owned())
                    .await;
            }
            PermissionState::Granted => {}
        }

        match self.devices.enumerate_devices().await {
            Ok(devices) => {
                debug!("Found {} capture devices", devices.len());
                self.view.show_devices(&devices).await;

                let unlabelled = devices.iter().any(|d| d.label.is_empty());
                if permission == PermissionState::Granted && unlabelled {
                    self.view
                        .notify_error(
                            "Grant persistent camera access to show device names".to_owned(),
                        )
                        .await;
                }
            }
            Err(e) => {
                warn!("Failed to list capture devices: {}", e);
                self.view.notify_error(e.to_string()).await;
            }
        }
    }

    /// Capture from `device_id` (or the first device), render it locally and
    /// become a sender.
    pub async fn start_capture(
        &mut self,
        device_id: Option<&str>,
    ) -> Result<Option<TrackSettings>, NegotiationError> {
        let devices = self.devices.enumerate_devices().await?;
        let device = match device_id {
            Some(id) => devices
                .iter()
                .find(|d| d.device_id == id)
                .ok_or_else(|| MediaError::DeviceNotFound(id.to_owned()))?,
            None => devices.first().ok_or(MediaError::NoDevices)?,
        };

        let constraints = CaptureConstraints::for_device(device, &self.config.default_resolutions);
        debug!("Capture constraints for {:?}: {:?}", device.label, constraints);

        let media = self.devices.acquire(constraints).await?;
        let settings = media.video_settings();

        self.view.render_local(&media).await;
        if let Some(settings) = settings {
            self.view.resize(settings).await;
        }

        match settings {
            Some(s) => info!("Capturing from {:?} at {}", device.label, s),
            None => info!("Capturing from {:?}", device.label),
        }
        self.capability.set_captured(media);
        Ok(settings)
    }

    /// Replace any current session with a fresh one and offer it to the peer.
    pub async fn start_call(&mut self) -> Result<SessionId, NegotiationError> {
        let session = self.open_session(SessionOrigin::LocalOffer).await?;
        let session = self.session.insert(session);
        let id = session.id();

        let offer = session
            .transport()
            .create_offer()
            .await
            .map_err(NegotiationError::transport("create offer"))?;
        commit_and_send(
            session,
            &self.relay,
            self.config.description_order,
            SdpKind::Offer,
            offer,
        )
        .await?;

        info!("Sent offer for session {}", id);
        Ok(id)
    }

    /// Decode and dispatch one relay frame.
    pub async fn handle_inbound(&mut self, frame: &RelayFrame) -> Result<(), NegotiationError> {
        let message = frame.decode()?;
        self.handle_message(message).await
    }

    pub async fn handle_message(
        &mut self,
        message: SignalingMessage,
    ) -> Result<(), NegotiationError> {
        debug!("Received {} message", message.kind());
        match message {
            SignalingMessage::Offer { sdp } => self.handle_offer(sdp).await,
            SignalingMessage::Answer { sdp } => self.handle_answer(sdp).await,
            SignalingMessage::Candidate(candidate) => self.handle_candidate(candidate).await,
        }
    }

    async fn handle_offer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        let session = self.open_session(SessionOrigin::RemoteOffer).await?;
        let session = self.session.insert(session);
        let id = session.id();

        session
            .transport()
            .set_remote_description(SdpKind::Offer, sdp)
            .await
            .map_err(NegotiationError::transport("apply remote offer"))?;
        session.mark_remote_description_set().await;

        let answer = session
            .transport()
            .create_answer()
            .await
            .map_err(NegotiationError::transport("create answer"))?;
        commit_and_send(
            session,
            &self.relay,
            self.config.description_order,
            SdpKind::Answer,
            answer,
        )
        .await?;

        info!("Answered offer with session {}", id);
        Ok(())
    }

    async fn handle_answer(&mut self, sdp: String) -> Result<(), NegotiationError> {
        let session = self
            .session
            .as_mut()
            .ok_or(NegotiationError::NoActiveSession { message: "answer" })?;

        if session.origin() == SessionOrigin::RemoteOffer {
            return Err(NegotiationError::UnexpectedAnswer(session.id()));
        }
        if session.remote_description_set() {
            return Err(NegotiationError::AnswerAlreadyApplied(session.id()));
        }

        session
            .transport()
            .set_remote_description(SdpKind::Answer, sdp)
            .await
            .map_err(NegotiationError::transport("apply remote answer"))?;
        session.mark_remote_description_set().await;

        info!("Applied answer to session {}", session.id());
        Ok(())
    }

    async fn handle_candidate(&mut self, msg: CandidateMessage) -> Result<(), NegotiationError> {
        let session = self
            .session
            .as_mut()
            .ok_or(NegotiationError::NoActiveSession {
                message: "candidate",
            })?;

        let end_of_candidates = msg.candidate.is_none();
        let outcome = session
            .add_remote_candidate(msg.candidate)
            .await
            .map_err(NegotiationError::transport("add ICE candidate"))?;

        match outcome {
            CandidateOutcome::Applied if end_of_candidates => {
                debug!("End of remote candidates for session {}", session.id())
            }
            CandidateOutcome::Applied => {
                debug!(
                    "Added remote candidate to session {} (sendVideo={})",
                    session.id(),
                    msg.send_video
                )
            }
            CandidateOutcome::Buffered => {
                debug!(
                    "Buffered remote candidate for session {} ({} pending)",
                    session.id(),
                    session.pending_candidates()
                )
            }
            CandidateOutcome::Ignored => {
                debug!("Ignoring repeated end-of-candidates for session {}", session.id())
            }
        }
        Ok(())
    }

    /// Resize the view to the dimensions of the session's video.
    pub async fn adjust_resolution(&mut self) -> Result<TrackSettings, NegotiationError> {
        let session = self
            .session
            .as_ref()
            .ok_or(NegotiationError::NoActiveSession {
                message: "adjust-resolution",
            })?;

        let settings = session
            .transport()
            .video_settings()
            .await
            .map_err(NegotiationError::transport("inspect transceivers"))?
            .ok_or(NegotiationError::NoVideoSettings(session.id()))?;

        info!("Adjusting view to {}", settings);
        self.view.resize(settings).await;
        Ok(settings)
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.session_id() != Some(event.session()) {
            debug!("Dropping event from superseded session {}", event.session());
            return;
        }

        match event {
            TransportEvent::CandidateGathered(_, candidate) => {
                self.relay
                    .send(&SignalingMessage::Candidate(CandidateMessage {
                        candidate,
                        send_video: self.capability.send_video(),
                    }));
            }

            TransportEvent::RemoteTrack(id, stream) => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if session.remote_rendered() {
                    debug!("Session {} already renders a remote track", id);
                    return;
                }
                session.mark_remote_rendered();
                info!("Rendering remote stream {} for session {}", stream.stream_id(), id);
                self.view.render_remote(stream).await;
            }

            TransportEvent::StateChanged(id, state) => match state {
                ConnectionState::Connected => {
                    info!("Session {} connected", id);
                    self.set_phase(NegotiationPhase::Connected).await;
                }
                ConnectionState::Disconnected | ConnectionState::Failed => {
                    warn!("Session {} lost its connection ({})", id, state);
                    self.view.notify_error("Connection lost".to_owned()).await;
                    self.set_phase(NegotiationPhase::Idle).await;
                }
                _ => debug!("Session {} is {}", id, state),
            },
        }
    }

    /// Close the current session and build the transport for a new one. The
    /// caller stores the result as the current session.
    async fn open_session(
        &mut self,
        origin: SessionOrigin,
    ) -> Result<NegotiationSession, NegotiationError> {
        let role = self.capability.role();
        let media = match role {
            Role::Sender => Some(
                self.capability
                    .captured()
                    .cloned()
                    .ok_or(NegotiationError::NoCapturedMedia)?,
            ),
            Role::Receiver => None,
        };

        if let Some(previous) = self.session.take() {
            info!("Superseding session {}", previous.id());
            previous.close().await;
        }

        let id = SessionId::new();
        let guard = SessionGuard::new();
        let transport = self
            .transports
            .create(id, role, guard.clone(), self.event_tx.clone())
            .await
            .map_err(NegotiationError::transport("create peer connection"))?;
        let session = NegotiationSession::new(id, origin, transport, guard, media);

        let mut added = Ok(());
        if let Some(media) = session.media() {
            for track in media.tracks() {
                added = session.transport().add_track(track).await;
                if added.is_err() {
                    break;
                }
            }
        }
        if let Err(e) = added {
            session.close().await;
            return Err(NegotiationError::transport("add local track")(e));
        }

        info!("Opened {} session {} ({:?})", role, id, origin);
        self.set_phase(NegotiationPhase::Negotiating).await;
        Ok(session)
    }
}

async fn commit_and_send(
    session: &mut NegotiationSession,
    relay: &RelaySender,
    order: DescriptionOrder,
    kind: SdpKind,
    sdp: String,
) -> Result<(), NegotiationError> {
    let message = match kind {
        SdpKind::Offer => SignalingMessage::Offer { sdp: sdp.clone() },
        SdpKind::Answer => SignalingMessage::Answer { sdp: sdp.clone() },
    };

    if order == DescriptionOrder::SendThenCommit {
        relay.send(&message);
    }

    session
        .transport()
        .set_local_description(kind, sdp)
        .await
        .map_err(NegotiationError::transport("commit local description"))?;
    session.mark_local_description_set();

    if order == DescriptionOrder::CommitThenSend {
        relay.send(&message);
    }
    Ok(())
}
