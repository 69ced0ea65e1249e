use peercall_client::NegotiationPhase;
use peercall_client::relay::RelayFrame;
use tokio::sync::mpsc;

use crate::utils::{SIGNAL_TIMEOUT_MS, TestPeer, ViewEvent, answer, init_tracing};

fn is_error(event: &ViewEvent, text: &str) -> bool {
    matches!(event, ViewEvent::Error(msg) if msg.contains(text))
}

#[tokio::test]
async fn test_run_loop_reports_failures_to_view() {
    init_tracing();
    let TestPeer {
        negotiator,
        view,
        remote: _remote,
        ..
    } = TestPeer::new();

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (handle, task) = negotiator.spawn(inbound_rx);

    inbound_tx
        .send(RelayFrame::Text(r#"{"type":"bye"}"#.into()))
        .unwrap();
    assert!(
        view.wait_for(|e| is_error(e, "unknown signaling message type `bye`"), SIGNAL_TIMEOUT_MS)
            .await
    );

    inbound_tx.send(answer("stray-answer")).unwrap();
    assert!(
        view.wait_for(
            |e| is_error(e, "`answer` requires an active call session"),
            SIGNAL_TIMEOUT_MS
        )
        .await
    );

    assert!(handle.adjust_resolution().await);
    assert!(
        view.wait_for(
            |e| is_error(e, "`adjust-resolution` requires an active call session"),
            SIGNAL_TIMEOUT_MS
        )
        .await
    );

    drop(inbound_tx);
    assert!(
        view.wait_for(|e| is_error(e, "Lost connection to the relay"), SIGNAL_TIMEOUT_MS)
            .await
    );

    // The loop keeps serving commands without a relay.
    assert!(handle.start_call().await);
    assert!(
        view.wait_for_phase(NegotiationPhase::Negotiating, SIGNAL_TIMEOUT_MS)
            .await
    );

    assert!(handle.shutdown().await);
    task.await.unwrap();

    let relay_lost = view
        .errors()
        .iter()
        .filter(|msg| msg.as_str() == "Lost connection to the relay")
        .count();
    assert_eq!(relay_lost, 1);
}
