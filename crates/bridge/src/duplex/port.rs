use enhancer_core::DuplexFrame;
use tokio::sync::mpsc;

/// Identifier of one execution context (a tab or a window).
pub type ContextId = u64;

/// One end of a bidirectional frame channel.
#[derive(Debug)]
pub struct Port {
    tx: mpsc::UnboundedSender<DuplexFrame>,
    rx: mpsc::UnboundedReceiver<DuplexFrame>,
}

/// Two connected ports; frames sent on one arrive on the other.
#[must_use]
pub fn port_pair() -> (Port, Port) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (Port { tx: a_tx, rx: b_rx }, Port { tx: b_tx, rx: a_rx })
}

impl Port {
    /// Returns false when the far end is gone.
    pub fn send(&self, frame: DuplexFrame) -> bool {
        self.tx.send(frame).is_ok()
    }

    pub async fn recv(&mut self) -> Option<DuplexFrame> {
        self.rx.recv().await
    }

    pub fn split(self) -> (mpsc::UnboundedSender<DuplexFrame>, mpsc::UnboundedReceiver<DuplexFrame>) {
        (self.tx, self.rx)
    }
}
