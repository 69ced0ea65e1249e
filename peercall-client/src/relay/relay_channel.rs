use crate::error::RelayError;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use peercall_core::{SignalingError, SignalingMessage};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// A data frame as it came off the relay socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    Text(String),
    Binary(Bytes),
}

impl RelayFrame {
    pub fn decode(&self) -> Result<SignalingMessage, SignalingError> {
        match self {
            RelayFrame::Text(text) => SignalingMessage::decode(text),
            RelayFrame::Binary(data) => SignalingMessage::decode_bytes(data),
        }
    }
}

/// Outbound half of the relay channel. Cheap to clone.
#[derive(Clone)]
pub struct RelaySender {
    tx: mpsc::UnboundedSender<RelayFrame>,
}

impl RelaySender {
    /// Serialize and queue `msg`. A closed channel drops the message with a
    /// warning; there is no reconnection.
    pub fn send(&self, msg: &SignalingMessage) {
        let json = match msg.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {} message: {}", msg.kind(), e);
                return;
            }
        };

        if self.tx.send(RelayFrame::Text(json)).is_err() {
            warn!("Relay channel closed, dropping {} message", msg.kind());
        } else {
            debug!("Queued {} message for relay", msg.kind());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct RelayChannel {
    sender: RelaySender,
    inbound: mpsc::UnboundedReceiver<RelayFrame>,
}

impl RelayChannel {
    /// Open a WebSocket to the relay at `url` (`ws://` or `wss://`).
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|source| RelayError::Connect {
                url: url.to_owned(),
                source,
            })?;
        info!("Connected to relay {}", url);

        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<RelayFrame>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<RelayFrame>();

        let mut send_task = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let msg = match frame {
                    RelayFrame::Text(text) => Message::Text(text.into()),
                    RelayFrame::Binary(data) => Message::Binary(data),
                };
                if let Err(e) = sink.send(msg).await {
                    warn!("Relay write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let mut recv_task = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let frame = match msg {
                    Ok(Message::Text(text)) => RelayFrame::Text(text.as_str().to_owned()),
                    Ok(Message::Binary(data)) => RelayFrame::Binary(data),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Relay read failed: {}", e);
                        break;
                    }
                };
                if in_tx.send(frame).is_err() {
                    break;
                }
            }
        });

        let url = url.to_owned();
        tokio::spawn(async move {
            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };
            info!("Relay connection to {} closed", url);
        });

        Ok(Self {
            sender: RelaySender { tx: out_tx },
            inbound: in_rx,
        })
    }

    /// Two in-memory channels wired to each other: whatever one side sends,
    /// the other receives.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        let a = Self {
            sender: RelaySender { tx: b_tx },
            inbound: a_rx,
        };
        let b = Self {
            sender: RelaySender { tx: a_tx },
            inbound: b_rx,
        };
        (a, b)
    }

    pub fn sender(&self) -> RelaySender {
        self.sender.clone()
    }

    pub async fn recv(&mut self) -> Option<RelayFrame> {
        self.inbound.recv().await
    }

    /// A frame that has already arrived, without waiting.
    pub fn try_recv(&mut self) -> Option<RelayFrame> {
        self.inbound.try_recv().ok()
    }

    pub fn split(self) -> (RelaySender, mpsc::UnboundedReceiver<RelayFrame>) {
        (self.sender, self.inbound)
    }
}
