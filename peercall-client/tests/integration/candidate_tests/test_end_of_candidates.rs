use peercall_client::NegotiationError;
use peercall_client::transport::SdpKind;
use peercall_core::{CandidateMessage, IceCandidate, SignalingMessage};

use crate::utils::{TestPeer, TransportCall, answer, frame, init_tracing, offer};

fn candidate(candidate: Option<IceCandidate>) -> peercall_client::relay::RelayFrame {
    frame(&SignalingMessage::Candidate(CandidateMessage {
        candidate,
        send_video: true,
    }))
}

fn host() -> IceCandidate {
    IceCandidate {
        candidate: "candidate:1 1 udp 2130706431 192.168.1.20 50000 typ host".into(),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    }
}

#[tokio::test]
async fn test_candidate_without_session_is_reported() {
    init_tracing();
    let mut peer = TestPeer::new();

    let err = peer
        .negotiator
        .handle_inbound(&candidate(Some(host())))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NegotiationError::NoActiveSession {
            message: "candidate"
        }
    ));
}

#[tokio::test]
async fn test_candidates_wait_for_remote_description() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator.start_call().await.unwrap();
    peer.negotiator
        .handle_inbound(&candidate(Some(host())))
        .await
        .unwrap();
    peer.negotiator.handle_inbound(&candidate(None)).await.unwrap();

    let transport = peer.transports.last();
    assert_eq!(
        transport.count(|c| matches!(c, TransportCall::AddCandidate(_))),
        0
    );
    assert_eq!(peer.negotiator.session().unwrap().pending_candidates(), 2);

    peer.negotiator
        .handle_inbound(&answer("remote-answer"))
        .await
        .unwrap();

    let calls = transport.calls();
    let set_remote = transport
        .position(|c| matches!(c, TransportCall::SetRemote(SdpKind::Answer, _)))
        .unwrap();
    assert_eq!(calls[set_remote + 1], TransportCall::AddCandidate(Some(host())));
    assert_eq!(calls[set_remote + 2], TransportCall::AddCandidate(None));
    assert_eq!(peer.negotiator.session().unwrap().pending_candidates(), 0);
}

#[tokio::test]
async fn test_end_of_candidates_applied_once_per_session() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator
        .handle_inbound(&offer("remote-offer"))
        .await
        .unwrap();
    for _ in 0..3 {
        peer.negotiator.handle_inbound(&candidate(None)).await.unwrap();
    }

    let first = peer.transports.last();
    assert_eq!(
        first.count(|c| *c == TransportCall::AddCandidate(None)),
        1
    );

    // A new session gets its own marker.
    peer.negotiator
        .handle_inbound(&offer("second-offer"))
        .await
        .unwrap();
    peer.negotiator.handle_inbound(&candidate(None)).await.unwrap();

    let second = peer.transports.last();
    assert_eq!(
        second.count(|c| *c == TransportCall::AddCandidate(None)),
        1
    );
    assert_eq!(
        first.count(|c| *c == TransportCall::AddCandidate(None)),
        1
    );
}

#[tokio::test]
async fn test_null_candidate_with_stray_fields() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator
        .handle_inbound(&offer("remote-offer"))
        .await
        .unwrap();
    let raw = peercall_client::relay::RelayFrame::Text(
        r#"{"type":"candidate","candidate":null,"sdpMid":"0","sdpMLineIndex":0,"sendVideo":true}"#
            .into(),
    );
    peer.negotiator.handle_inbound(&raw).await.unwrap();

    assert_eq!(
        peer.transports
            .last()
            .count(|c| *c == TransportCall::AddCandidate(None)),
        1
    );
}

#[tokio::test]
async fn test_rejected_end_of_candidates_can_be_retried() {
    init_tracing();
    let mut peer = TestPeer::with(
        peercall_client::CallConfig::default(),
        crate::utils::MockTransportFactory::new().failing_candidates(1),
        peercall_client::media::SyntheticCamera::default(),
    );

    peer.negotiator
        .handle_inbound(&offer("remote-offer"))
        .await
        .unwrap();

    let err = peer
        .negotiator
        .handle_inbound(&candidate(None))
        .await
        .unwrap_err();
    assert!(matches!(err, NegotiationError::Transport { .. }));

    peer.negotiator.handle_inbound(&candidate(None)).await.unwrap();
    peer.negotiator.handle_inbound(&candidate(None)).await.unwrap();

    // One rejected attempt, one accepted, then the repeat is ignored.
    assert_eq!(
        peer.transports
            .last()
            .count(|c| *c == TransportCall::AddCandidate(None)),
        2
    );
}
