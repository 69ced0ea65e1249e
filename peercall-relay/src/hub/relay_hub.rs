use crate::hub::ConnectionId;
use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct RelayInner {
    peers: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
}

/// Registry of open relay sockets. Frames are forwarded verbatim; the hub
/// never looks inside them.
#[derive(Clone)]
pub struct RelayHub {
    inner: Arc<RelayInner>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                peers: DashMap::new(),
            }),
        }
    }

    pub fn add_peer(&self, id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(id, tx);
    }

    pub fn remove_peer(&self, id: &ConnectionId) {
        self.inner.peers.remove(id);
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    /// Send `msg` to every connection except `from`. Returns how many
    /// connections accepted it.
    pub fn forward(&self, from: &ConnectionId, msg: Message) -> usize {
        let mut delivered = 0;

        for entry in self.inner.peers.iter() {
            if entry.key() == from {
                continue;
            }
            match entry.value().send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to queue frame for {}: {:?}", entry.key(), e),
            }
        }

        debug!("Relayed frame from {} to {} peer(s)", from, delivered);
        delivered
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}
