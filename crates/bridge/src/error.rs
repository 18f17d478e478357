//! Typed error enum for the bridge layer.

use enhancer_storage::StorageError;
use thiserror::Error;

/// Failure of a cross-context request or of a collaborator call.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The store failed while serving a request in this context.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// The far side reported that the request failed.
    #[error("remote: {0}")]
    Remote(String),

    /// No reply arrived within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The connection closed while the request was pending.
    #[error("connection closed before a reply arrived")]
    Disconnected,

    /// The serving side of the channel is gone.
    #[error("channel closed")]
    ChannelClosed,

    /// The script injection host rejected a call.
    #[error("script host: {0}")]
    ScriptHost(String),

    /// The host application could not be controlled.
    #[error("app control: {0}")]
    AppControl(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Whether the request may succeed if sent again on a fresh connection.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::Timeout(_) | Self::Disconnected => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
