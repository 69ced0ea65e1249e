use peercall_client::MediaError;
use peercall_client::media::{SyntheticCamera, TrackSettings};
use peercall_client::{CallConfig, NegotiationError};
use peercall_core::Role;

use crate::utils::{
    MockTransportFactory, StopTrackingCamera, TestPeer, TransportCall, ViewEvent, init_tracing,
};

fn vga() -> TrackSettings {
    TrackSettings {
        width: 640,
        height: 480,
        frame_rate: Some(30.0),
    }
}

#[tokio::test]
async fn test_capture_applies_default_resolution_by_label() {
    init_tracing();
    let camera = SyntheticCamera::new("USB3.0 Capture Video (534d:2109)", vga());
    let mut peer = TestPeer::with(CallConfig::default(), MockTransportFactory::new(), camera);

    let settings = peer.negotiator.start_capture(None).await.unwrap().unwrap();

    assert_eq!((settings.width, settings.height), (1920, 1080));
    assert_eq!(peer.negotiator.role(), Role::Sender);
    assert!(matches!(
        peer.view.events().as_slice(),
        [ViewEvent::Local(label), ViewEvent::Resize(s)]
            if label.starts_with("USB3.0") && s.width == 1920
    ));
}

#[tokio::test]
async fn test_capture_keeps_native_size_for_other_devices() {
    init_tracing();
    let camera = SyntheticCamera::new("FaceTime HD Camera", vga());
    let mut peer = TestPeer::with(CallConfig::default(), MockTransportFactory::new(), camera);

    let settings = peer.negotiator.start_capture(None).await.unwrap().unwrap();
    assert_eq!(settings, vga());
}

#[tokio::test]
async fn test_capture_unknown_device() {
    init_tracing();
    let mut peer = TestPeer::new();

    let err = peer
        .negotiator
        .start_capture(Some("missing"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NegotiationError::Media(MediaError::DeviceNotFound(id)) if id == "missing"
    ));
    assert_eq!(peer.negotiator.role(), Role::Receiver);
}

#[tokio::test]
async fn test_sender_attaches_tracks_to_every_session() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator.start_capture(None).await.unwrap();
    peer.negotiator.start_call().await.unwrap();
    peer.negotiator
        .handle_inbound(&crate::utils::offer("remote-offer"))
        .await
        .unwrap();

    for transport in peer.transports.created() {
        assert_eq!(transport.role, Role::Sender);
        assert_eq!(
            transport.count(|c| matches!(c, TransportCall::AddTrack(_))),
            1
        );
    }

    // Tracks go on before the offer is applied so they can be negotiated.
    let answering = peer.transports.last();
    let add_track = answering
        .position(|c| matches!(c, TransportCall::AddTrack(_)))
        .unwrap();
    let set_remote = answering
        .position(|c| matches!(c, TransportCall::SetRemote(..)))
        .unwrap();
    assert!(add_track < set_remote);
}

#[tokio::test]
async fn test_adjust_resolution_uses_transport_settings() {
    init_tracing();
    let hd = TrackSettings {
        width: 1280,
        height: 720,
        frame_rate: None,
    };
    let mut peer = TestPeer::with(
        CallConfig::default(),
        MockTransportFactory::new().with_video_settings(hd),
        SyntheticCamera::default(),
    );

    let err = peer.negotiator.adjust_resolution().await.unwrap_err();
    assert!(matches!(err, NegotiationError::NoActiveSession { .. }));

    peer.negotiator.start_call().await.unwrap();
    assert_eq!(peer.negotiator.adjust_resolution().await.unwrap(), hd);
    assert_eq!(peer.view.resizes(), vec![hd]);
}

#[tokio::test]
async fn test_adjust_resolution_without_video() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator.start_call().await.unwrap();
    let session = peer.negotiator.session_id().unwrap();

    let err = peer.negotiator.adjust_resolution().await.unwrap_err();
    assert!(matches!(err, NegotiationError::NoVideoSettings(id) if id == session));
    assert!(peer.view.resizes().is_empty());
}

#[tokio::test]
async fn test_recapture_keeps_live_session_media() {
    init_tracing();
    let camera = StopTrackingCamera::new();
    let mut peer = TestPeer::with(
        CallConfig::default(),
        MockTransportFactory::new(),
        camera.clone(),
    );

    peer.negotiator.start_capture(None).await.unwrap();
    peer.negotiator.start_call().await.unwrap();
    let session = peer.negotiator.session_id();

    peer.negotiator.start_capture(None).await.unwrap();
    assert_eq!(camera.acquired(), 2);
    assert_eq!(peer.negotiator.session_id(), session);
    assert!(!camera.stopped(0), "the live session still sends the first capture");
    assert!(!camera.stopped(1));

    // A new session picks up the second capture and releases the first.
    peer.negotiator.start_call().await.unwrap();
    assert!(camera.stopped(0));
    assert!(!camera.stopped(1));
}
