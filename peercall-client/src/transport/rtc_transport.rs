use crate::media::{CapturedTrack, RemoteFeed, RemoteStream, TrackKind, TrackSettings};
use crate::session::SessionGuard;
use crate::transport::{
    ConnectionState, PeerTransport, SdpKind, TransportConfig, TransportEvent, TransportFactory,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use peercall_core::{IceCandidate, Role, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Builds [`RtcTransport`]s sharing one ICE configuration.
#[derive(Debug, Clone, Default)]
pub struct RtcTransportFactory {
    config: TransportConfig,
}

impl RtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        session: SessionId,
        role: Role,
        guard: SessionGuard,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>> {
        let transport = RtcTransport::new(session, role, &self.config, guard, events).await?;
        Ok(Box::new(transport))
    }
}

/// A `webrtc` peer connection reporting its callbacks as [`TransportEvent`]s.
pub struct RtcTransport {
    session: SessionId,
    role: Role,
    peer_connection: Arc<RTCPeerConnection>,
    guard: SessionGuard,
    local_settings: DashMap<String, TrackSettings>,
    remote_settings: Arc<DashMap<String, TrackSettings>>,
}

impl RtcTransport {
    pub async fn new(
        session: SessionId,
        role: Role,
        config: &TransportConfig,
        guard: SessionGuard,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut settings = SettingEngine::default();
        settings.set_include_loopback_candidate(config.include_loopback);

        let api = APIBuilder::new()
            .with_setting_engine(settings)
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("failed to create peer connection")?,
        );
        let remote_settings = Arc::new(DashMap::new());

        let state_tx = event_tx.clone();
        let state_guard = guard.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let guard = state_guard.clone();

                Box::pin(async move {
                    info!("Peer connection state for session {}: {}", session, s);
                    let Some(state) = connection_state(s) else {
                        return;
                    };
                    if guard.is_cancelled() {
                        return;
                    }
                    let _ = tx.send(TransportEvent::StateChanged(session, state)).await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let ice_guard = guard.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let guard = ice_guard.clone();

            Box::pin(async move {
                if guard.is_cancelled() {
                    return;
                }
                let candidate = match c {
                    Some(c) => match c.to_json() {
                        Ok(init) => Some(IceCandidate::from(init)),
                        Err(e) => {
                            warn!("Dropping unserializable local candidate: {}", e);
                            return;
                        }
                    },
                    None => None,
                };
                let _ = tx
                    .send(TransportEvent::CandidateGathered(session, candidate))
                    .await;
            })
        }));

        if role == Role::Receiver {
            let track_tx = event_tx.clone();
            let track_guard = guard.clone();
            let track_settings = remote_settings.clone();
            peer_connection.on_track(Box::new(
                move |track: Arc<TrackRemote>,
                      _receiver: Arc<RTCRtpReceiver>,
                      _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let guard = track_guard.clone();
                let settings = track_settings.clone();

                Box::pin(async move {
                    if guard.is_cancelled() {
                        return;
                    }
                    let kind = match track.kind() {
                        RTPCodecType::Video => TrackKind::Video,
                        RTPCodecType::Audio => TrackKind::Audio,
                        _ => return,
                    };
                    let codec = track.codec();
                    debug!(
                        "Remote {:?} track {} ({}) for session {}",
                        kind,
                        track.id(),
                        codec.capability.mime_type,
                        session
                    );

                    let (stream, feed) = RemoteStream::new(
                        track.stream_id(),
                        track.id(),
                        kind,
                        &codec.capability.mime_type,
                    );
                    tokio::spawn(read_remote_track(track, feed, settings, guard));
                    let _ = tx.send(TransportEvent::RemoteTrack(session, stream)).await;
                })
            }));
        }

        Ok(Self {
            session,
            role,
            peer_connection,
            guard,
            local_settings: DashMap::new(),
            remote_settings,
        })
    }

    fn description(kind: SdpKind, sdp: String) -> Result<RTCSessionDescription> {
        let desc = match kind {
            SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
        };
        Ok(desc)
    }
}

#[async_trait]
impl PeerTransport for RtcTransport {
    async fn create_offer(&self) -> Result<String> {
        // A receiver has no tracks of its own; without a transceiver the
        // offer would carry no video section at all.
        if self.role == Role::Receiver && self.peer_connection.get_transceivers().await.is_empty() {
            self.peer_connection
                .add_transceiver_from_kind(
                    RTPCodecType::Video,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .context("failed to add receive-only video transceiver")?;
        }

        let offer = self.peer_connection.create_offer(None).await?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(answer.sdp)
    }

    async fn set_local_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        let desc = Self::description(kind, sdp)?;
        self.peer_connection.set_local_description(desc).await?;
        Ok(())
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        let desc = Self::description(kind, sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_track(&self, track: &CapturedTrack) -> Result<()> {
        let local: Arc<dyn TrackLocal + Send + Sync> = track.track.clone();
        let rtp_sender = self
            .peer_connection
            .add_track(local)
            .await
            .context("failed to add local track")?;

        if let Some(settings) = track.settings {
            self.local_settings
                .insert(track.track.id().to_owned(), settings);
        }

        // RTCP has to be read for the interceptors to process it.
        let guard = self.guard.clone();
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            loop {
                tokio::select! {
                    _ = guard.cancelled() => break,
                    read = rtp_sender.read(&mut rtcp_buf) => {
                        if read.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Option<IceCandidate>) -> Result<()> {
        // An empty candidate string marks the end of remote candidates.
        let init = candidate.map(RTCIceCandidateInit::from).unwrap_or_default();
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn video_settings(&self) -> Result<Option<TrackSettings>> {
        let transceivers = self.peer_connection.get_transceivers().await;
        let Some(video) = transceivers
            .into_iter()
            .find(|t| t.kind() == RTPCodecType::Video)
        else {
            return Ok(None);
        };

        for track in video.receiver().await.tracks().await {
            if let Some(settings) = self.remote_settings.get(&track.id()) {
                return Ok(Some(*settings));
            }
        }

        let local = video.sender().await.track().await;
        Ok(local.and_then(|track| self.local_settings.get(track.id()).map(|s| *s)))
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing transport for session {}", self.session);
        self.guard.cancel();
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}

async fn read_remote_track(
    track: Arc<TrackRemote>,
    feed: RemoteFeed,
    settings: Arc<DashMap<String, TrackSettings>>,
    guard: SessionGuard,
) {
    loop {
        let packet = tokio::select! {
            _ = guard.cancelled() => break,
            read = track.read_rtp() => match read {
                Ok((packet, _)) => packet,
                Err(e) => {
                    debug!("Remote track {} ended: {}", feed.track_id(), e);
                    break;
                }
            },
        };

        if let Some(learnt) = feed.push(packet) {
            settings.insert(feed.track_id().to_owned(), learnt);
        }
    }
}
