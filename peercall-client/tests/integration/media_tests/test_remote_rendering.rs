use peercall_client::media::{RemoteStream, TrackKind};
use peercall_client::transport::TransportEvent;

use crate::utils::{TestPeer, init_tracing};

fn remote(track_id: &str) -> RemoteStream {
    RemoteStream::new("remote-stream", track_id, TrackKind::Video, "video/VP8").0
}

#[tokio::test]
async fn test_first_remote_track_is_rendered_once() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator.start_call().await.unwrap();
    let session = peer.negotiator.session_id().unwrap();

    for track in ["video", "video-2"] {
        peer.negotiator
            .handle_transport_event(TransportEvent::RemoteTrack(session, remote(track)))
            .await;
    }

    let remotes = peer.view.remotes();
    assert_eq!(remotes.len(), 1);
    assert_eq!(remotes[0].track_id(), "video");
}

#[tokio::test]
async fn test_each_session_renders_its_own_track() {
    init_tracing();
    let mut peer = TestPeer::new();

    peer.negotiator.start_call().await.unwrap();
    let first = peer.negotiator.session_id().unwrap();
    peer.negotiator
        .handle_transport_event(TransportEvent::RemoteTrack(first, remote("a")))
        .await;

    peer.negotiator.start_call().await.unwrap();
    let second = peer.negotiator.session_id().unwrap();
    peer.negotiator
        .handle_transport_event(TransportEvent::RemoteTrack(first, remote("stale")))
        .await;
    peer.negotiator
        .handle_transport_event(TransportEvent::RemoteTrack(second, remote("b")))
        .await;

    let ids: Vec<_> = peer
        .view
        .remotes()
        .iter()
        .map(|r| r.track_id().to_owned())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}
