use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use enhancer_core::{BridgeMessage, DuplexFrame, InvocationId, StoreRequest};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::Port;
use crate::{BridgeError, Result};

type Waiter = oneshot::Sender<Result<Value>>;

#[derive(Debug, Default)]
struct Pending {
    closed: bool,
    waiters: HashMap<InvocationId, Waiter>,
}

/// Content-context side of a duplex connection.
///
/// Requests are correlated by a fresh [`InvocationId`]; replies resolve
/// only their own request and may arrive in any order.
#[derive(Debug, Clone)]
pub struct DuplexClient {
    tx: mpsc::UnboundedSender<DuplexFrame>,
    pending: Arc<Mutex<Pending>>,
    timeout: Duration,
}

impl DuplexClient {
    /// Start reading `port`. Inbound bridge messages that are not replies
    /// (such as `open-menu`) arrive on the returned receiver.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn connect(port: Port, timeout: Duration) -> (Self, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (tx, rx) = port.split();
        let pending = Arc::new(Mutex::new(Pending::default()));
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        tokio::spawn(read_frames(rx, Arc::clone(&pending), notify_tx));
        (Self { tx, pending, timeout }, notify_rx)
    }

    /// Send `message` and wait for its reply.
    ///
    /// # Errors
    /// `Timeout` when no reply arrives in time, `Disconnected` when the
    /// connection closes first, `Remote` when the far side failed.
    pub async fn request(&self, message: &BridgeMessage) -> Result<Value> {
        let invocation = InvocationId::generate();
        let (waiter, reply) = oneshot::channel();
        {
            let mut pending = self.lock();
            if pending.closed {
                return Err(BridgeError::Disconnected);
            }
            pending.waiters.insert(invocation.clone(), waiter);
        }

        if self.tx.send(DuplexFrame::request(message, invocation.clone())).is_err() {
            self.forget(&invocation);
            return Err(BridgeError::Disconnected);
        }

        match tokio::time::timeout(self.timeout, reply).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::Disconnected),
            Err(_) => {
                self.forget(&invocation);
                tracing::debug!(%invocation, "duplex request timed out");
                Err(BridgeError::Timeout(self.timeout))
            },
        }
    }

    /// Run a store request on the far side.
    ///
    /// # Errors
    /// See [`DuplexClient::request`].
    pub async fn query(&self, request: StoreRequest) -> Result<Value> {
        self.request(&BridgeMessage::query(request)).await
    }

    /// Fire-and-forget message.
    ///
    /// # Errors
    /// Returns `Disconnected` if the far side is gone.
    pub fn notify(&self, message: &BridgeMessage) -> Result<()> {
        self.tx
            .send(DuplexFrame::notification(message))
            .map_err(|_| BridgeError::Disconnected)
    }

    /// Requests still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.lock().waiters.len()
    }

    fn forget(&self, invocation: &InvocationId) {
        self.lock().waiters.remove(invocation);
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn read_frames(
    mut rx: mpsc::UnboundedReceiver<DuplexFrame>,
    pending: Arc<Mutex<Pending>>,
    notifications: mpsc::UnboundedSender<BridgeMessage>,
) {
    while let Some(frame) = rx.recv().await {
        if frame.is_reply() {
            let Some(invocation) = frame.invocation else { continue };
            let waiter = pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .waiters
                .remove(&invocation);
            let Some(waiter) = waiter else {
                tracing::debug!(%invocation, "reply for unknown or expired invocation");
                continue;
            };
            let result = match frame.error {
                Some(error) => Err(BridgeError::Remote(error)),
                None => Ok(frame.message),
            };
            let _ = waiter.send(result);
        } else if frame.on_bridge_channel() {
            if let Some(message) = BridgeMessage::parse(&frame.message) {
                let _ = notifications.send(message);
            }
        } else {
            tracing::debug!(channel = ?frame.channel, "dropping frame from another channel");
        }
    }

    let waiters = {
        let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.closed = true;
        std::mem::take(&mut pending.waiters)
    };
    for (_, waiter) in waiters {
        let _ = waiter.send(Err(BridgeError::Disconnected));
    }
}
