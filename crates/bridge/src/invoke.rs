//! Request/response channel between a renderer context and the host process.
//!
//! `invoke` sends one message and waits for one answer; `send` is one-way.
//! The server answers `query-database` only; anything else gets `None`.

use enhancer_core::{BridgeAction, BridgeMessage};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::handler::RequestHandler;
use crate::{BridgeError, Result};

type Reply = std::result::Result<Option<Value>, String>;

#[derive(Debug)]
enum InvokeCall {
    Invoke { message: Value, reply: oneshot::Sender<Reply> },
    Send { message: Value },
}

/// Renderer-side handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InvokeClient {
    tx: mpsc::UnboundedSender<InvokeCall>,
}

/// Host-side end of the channel.
#[derive(Debug)]
pub struct InvokeServer {
    rx: mpsc::UnboundedReceiver<InvokeCall>,
}

/// Create a connected client/server pair.
#[must_use]
pub fn invoke_channel() -> (InvokeClient, InvokeServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InvokeClient { tx }, InvokeServer { rx })
}

impl InvokeClient {
    /// Send `message` and wait for the answer. `None` when the host has no
    /// handler for it.
    ///
    /// # Errors
    /// Returns `Remote` if the host failed to serve the request and
    /// `ChannelClosed` if the server is gone.
    pub async fn invoke(&self, message: &BridgeMessage) -> Result<Option<Value>> {
        self.invoke_value(message.to_value()).await
    }

    /// Like [`InvokeClient::invoke`] for a message body that has not been
    /// validated.
    ///
    /// # Errors
    /// See [`InvokeClient::invoke`].
    pub async fn invoke_value(&self, message: Value) -> Result<Option<Value>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(InvokeCall::Invoke { message, reply })
            .map_err(|_| BridgeError::ChannelClosed)?;
        rx.await.map_err(|_| BridgeError::ChannelClosed)?.map_err(BridgeError::Remote)
    }

    /// One-way message.
    ///
    /// # Errors
    /// Returns `ChannelClosed` if the server is gone.
    pub fn send(&self, message: &BridgeMessage) -> Result<()> {
        self.tx
            .send(InvokeCall::Send { message: message.to_value() })
            .map_err(|_| BridgeError::ChannelClosed)
    }
}

impl InvokeServer {
    /// Serve calls in arrival order until every client is dropped.
    pub async fn serve(mut self, handler: &RequestHandler) {
        while let Some(call) = self.rx.recv().await {
            match call {
                InvokeCall::Invoke { message, reply } => {
                    let Some(BridgeMessage::Action(BridgeAction::QueryDatabase(request))) =
                        BridgeMessage::parse(&message)
                    else {
                        let _ = reply.send(Ok(None));
                        continue;
                    };
                    match handler.execute(&request).await {
                        Ok(value) => {
                            let _ = reply.send(Ok(Some(value)));
                            handler.after_reply(&request).await;
                        },
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                transient = e.is_transient(),
                                query = %request.query(),
                                "invoke request failed"
                            );
                            let _ = reply.send(Err(e.to_string()));
                        },
                    }
                },
                InvokeCall::Send { message } => match BridgeMessage::parse(&message) {
                    Some(BridgeMessage::Control(control)) => {
                        if let Err(e) = handler.control(control).await {
                            tracing::warn!(error = %e, ?control, "control message failed");
                        }
                    },
                    Some(other) => tracing::debug!(?other, "one-way message without a handler"),
                    None => {},
                },
            }
        }
        tracing::debug!("invoke channel closed");
    }
}
