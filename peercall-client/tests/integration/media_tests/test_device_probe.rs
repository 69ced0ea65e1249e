use peercall_client::CallConfig;
use peercall_client::media::{PermissionState, SyntheticCamera, TrackSettings};

use crate::utils::{MockTransportFactory, TestPeer, ViewEvent, init_tracing};

fn probe_peer(camera: SyntheticCamera) -> TestPeer {
    TestPeer::with(CallConfig::default(), MockTransportFactory::new(), camera)
}

fn settings() -> TrackSettings {
    TrackSettings {
        width: 320,
        height: 240,
        frame_rate: None,
    }
}

#[tokio::test]
async fn test_granted_with_labels_is_quiet() {
    init_tracing();
    let peer = probe_peer(SyntheticCamera::new("Camera", settings()));

    peer.negotiator.probe_devices().await;

    assert!(peer.view.errors().is_empty());
    assert!(matches!(
        peer.view.events().as_slice(),
        [ViewEvent::Devices(devices)] if devices.len() == 1
    ));
}

#[tokio::test]
async fn test_prompt_asks_to_press_capture() {
    init_tracing();
    let peer = probe_peer(
        SyntheticCamera::new("Camera", settings()).with_permission(PermissionState::Prompt),
    );

    peer.negotiator.probe_devices().await;

    assert_eq!(
        peer.view.errors(),
        vec!["Press capture to grant camera access".to_owned()]
    );
}

#[tokio::test]
async fn test_denied_reports_permission() {
    init_tracing();
    let peer = probe_peer(
        SyntheticCamera::new("Camera", settings()).with_permission(PermissionState::Denied),
    );

    peer.negotiator.probe_devices().await;

    let errors = peer.view.errors();
    assert_eq!(errors[0], "Allow camera access to capture video");
    assert_eq!(errors.len(), 2);
}

#[tokio::test]
async fn test_hidden_labels_ask_for_persistent_access() {
    init_tracing();
    let peer = probe_peer(SyntheticCamera::new("", settings()));

    peer.negotiator.probe_devices().await;

    assert_eq!(
        peer.view.errors(),
        vec!["Grant persistent camera access to show device names".to_owned()]
    );
}
