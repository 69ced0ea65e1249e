use tokio::sync::watch;

/// Cancellation flag shared by everything spawned for one negotiation
/// session. Cancelled when the session is superseded or the negotiator stops.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl SessionGuard {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}
