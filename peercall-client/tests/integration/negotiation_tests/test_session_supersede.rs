use peercall_client::transport::{ConnectionState, TransportEvent};
use peercall_client::NegotiationPhase;
use peercall_core::{IceCandidate, SignalingMessage};

use crate::utils::{TestPeer, TransportCall, count_kind, init_tracing, offer};

fn host_candidate() -> IceCandidate {
    IceCandidate {
        candidate: "candidate:1 1 udp 2130706431 127.0.0.1 50000 typ host".into(),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    }
}

#[tokio::test]
async fn test_second_offer_supersedes_first() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator
        .handle_inbound(&offer("offer-a"))
        .await
        .unwrap();
    peer.negotiator
        .handle_inbound(&offer("offer-b"))
        .await
        .unwrap();

    let sent = peer.sent();
    assert_eq!(count_kind(&sent, "answer"), 2);

    let created = peer.transports.created();
    assert_eq!(created.len(), 2);
    let (first, second) = (&created[0], &created[1]);

    assert!(first.guard.is_cancelled());
    assert_eq!(first.count(|c| *c == TransportCall::Close), 1);
    assert!(!second.guard.is_cancelled());
    assert_eq!(second.count(|c| *c == TransportCall::Close), 0);
    assert_eq!(peer.negotiator.session_id(), Some(second.session));
}

#[tokio::test]
async fn test_events_from_superseded_session_are_dropped() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator.start_call().await.unwrap();
    peer.negotiator.start_call().await.unwrap();
    peer.sent();

    let created = peer.transports.created();
    let stale = created[0].session;

    peer.negotiator
        .handle_transport_event(TransportEvent::CandidateGathered(
            stale,
            Some(host_candidate()),
        ))
        .await;
    peer.negotiator
        .handle_transport_event(TransportEvent::StateChanged(
            stale,
            ConnectionState::Connected,
        ))
        .await;

    assert!(peer.sent().is_empty());
    assert_eq!(peer.negotiator.phase(), NegotiationPhase::Negotiating);

    let current = created[1].session;
    peer.negotiator
        .handle_transport_event(TransportEvent::CandidateGathered(
            current,
            Some(host_candidate()),
        ))
        .await;
    assert!(matches!(
        peer.sent().as_slice(),
        [SignalingMessage::Candidate(_)]
    ));
}

#[tokio::test]
async fn test_events_arrive_through_the_channel() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator.start_call().await.unwrap();
    let handle = peer.transports.last();
    handle
        .emit(TransportEvent::StateChanged(
            handle.session,
            ConnectionState::Connected,
        ))
        .await;

    let event = peer.negotiator.next_transport_event().await.unwrap();
    assert_eq!(event.session(), handle.session);
    peer.negotiator.handle_transport_event(event).await;

    assert_eq!(peer.negotiator.phase(), NegotiationPhase::Connected);
    assert_eq!(peer.view.phase(), NegotiationPhase::Connected);
}

#[tokio::test]
async fn test_connection_loss_returns_to_idle() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator.start_call().await.unwrap();
    let session = peer.negotiator.session_id().unwrap();

    for state in [ConnectionState::Connected, ConnectionState::Failed] {
        peer.negotiator
            .handle_transport_event(TransportEvent::StateChanged(session, state))
            .await;
    }

    assert_eq!(peer.negotiator.phase(), NegotiationPhase::Idle);
    assert!(peer.view.errors().iter().any(|e| e == "Connection lost"));
}
