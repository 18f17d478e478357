//! Request envelope and bridge message shapes.
//!
//! Every execution context talks to the store with the same
//! `{ namespace, query, args }` envelope, wrapped in a bridge message and,
//! on the duplex channel, in a [`DuplexFrame`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::BRIDGE_CHANNEL;
use crate::{CoreError, Namespace};

/// Store operation discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Query {
    Get,
    Set,
    Remove,
    Export,
    Import,
}

impl Query {
    /// Wire name of the query.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Remove => "remove",
            Self::Export => "export",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed `args` payload, one variant per [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    /// Read `key`; `fallbacks` is consulted by local key on a miss.
    Get { key: String, fallbacks: Map<String, Value> },
    /// Upsert one value.
    Set { key: String, value: Value },
    /// Delete one or more keys.
    Remove { keys: Vec<String> },
    /// Dump the namespace with prefixes stripped.
    Export,
    /// Upsert raw values under the namespace.
    Import { obj: Map<String, Value> },
}

impl StoreOperation {
    #[must_use]
    pub const fn query(&self) -> Query {
        match *self {
            Self::Get { .. } => Query::Get,
            Self::Set { .. } => Query::Set,
            Self::Remove { .. } => Query::Remove,
            Self::Export => Query::Export,
            Self::Import { .. } => Query::Import,
        }
    }
}

/// A store request as carried by either transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStoreRequest", into = "RawStoreRequest")]
pub struct StoreRequest {
    pub namespace: Namespace,
    pub operation: StoreOperation,
}

impl StoreRequest {
    pub fn new(namespace: impl Into<Namespace>, operation: StoreOperation) -> Self {
        Self { namespace: namespace.into(), operation }
    }

    pub fn get(namespace: impl Into<Namespace>, key: impl Into<String>) -> Self {
        Self::new(namespace, StoreOperation::Get { key: key.into(), fallbacks: Map::new() })
    }

    pub fn set(namespace: impl Into<Namespace>, key: impl Into<String>, value: Value) -> Self {
        Self::new(namespace, StoreOperation::Set { key: key.into(), value })
    }

    pub fn remove<I, S>(namespace: impl Into<Namespace>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys.into_iter().map(Into::into).collect();
        Self::new(namespace, StoreOperation::Remove { keys })
    }

    pub fn export(namespace: impl Into<Namespace>) -> Self {
        Self::new(namespace, StoreOperation::Export)
    }

    pub fn import(namespace: impl Into<Namespace>, obj: Map<String, Value>) -> Self {
        Self::new(namespace, StoreOperation::Import { obj })
    }

    #[must_use]
    pub const fn query(&self) -> Query {
        self.operation.query()
    }

    /// The local key targeted by a `get` or `set`.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match &self.operation {
            StoreOperation::Get { key, .. } | StoreOperation::Set { key, .. } => Some(key),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct GetArgs {
    key: String,
    #[serde(default)]
    fallbacks: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct SetArgs {
    key: String,
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
struct RemoveArgs {
    keys: OneOrMany,
}

#[derive(Deserialize)]
struct ImportArgs {
    obj: Map<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct RawStoreRequest {
    #[serde(default)]
    namespace: Namespace,
    query: Query,
    #[serde(default)]
    args: Value,
}

impl TryFrom<RawStoreRequest> for StoreRequest {
    type Error = CoreError;

    fn try_from(raw: RawStoreRequest) -> Result<Self, Self::Error> {
        let args = match raw.args {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let operation = match raw.query {
            Query::Get => {
                let GetArgs { key, fallbacks } = serde_json::from_value(args)?;
                StoreOperation::Get { key, fallbacks: fallbacks.unwrap_or_default() }
            },
            Query::Set => {
                let SetArgs { key, value } = serde_json::from_value(args)?;
                StoreOperation::Set { key, value }
            },
            Query::Remove => {
                let RemoveArgs { keys } = serde_json::from_value(args)?;
                let keys = match keys {
                    OneOrMany::One(key) => vec![key],
                    OneOrMany::Many(keys) => keys,
                };
                StoreOperation::Remove { keys }
            },
            Query::Export => StoreOperation::Export,
            Query::Import => {
                let ImportArgs { obj } = serde_json::from_value(args)?;
                StoreOperation::Import { obj }
            },
        };
        Ok(Self { namespace: raw.namespace, operation })
    }
}

impl From<StoreRequest> for RawStoreRequest {
    fn from(req: StoreRequest) -> Self {
        let query = req.query();
        let args = match req.operation {
            StoreOperation::Get { key, fallbacks } => {
                let mut args = Map::new();
                args.insert("key".to_owned(), Value::String(key));
                if !fallbacks.is_empty() {
                    args.insert("fallbacks".to_owned(), Value::Object(fallbacks));
                }
                Value::Object(args)
            },
            StoreOperation::Set { key, value } => serde_json::json!({ "key": key, "value": value }),
            StoreOperation::Remove { keys } => serde_json::json!({ "keys": keys }),
            StoreOperation::Export => Value::Object(Map::new()),
            StoreOperation::Import { obj } => serde_json::json!({ "obj": obj }),
        };
        Self { namespace: req.namespace, query, args }
    }
}

/// Actions that carry a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "kebab-case")]
pub enum BridgeAction {
    QueryDatabase(StoreRequest),
}

/// Plain control messages. These never get a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Reload every application window or tab.
    ReloadApp,
    /// Sent by a content context once it has finished loading.
    LoadComplete,
    /// Sent to a content context to open the enhancer menu.
    OpenMenu,
}

/// Message body carried by either transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeMessage {
    Action(BridgeAction),
    Control(ControlMessage),
}

impl BridgeMessage {
    #[must_use]
    pub fn query(request: StoreRequest) -> Self {
        Self::Action(BridgeAction::QueryDatabase(request))
    }

    /// Parse an untrusted message body. Malformed bodies yield `None`.
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        match Self::deserialize(value) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unrecognized bridge message");
                None
            },
        }
    }

    #[must_use]
    pub fn as_store_request(&self) -> Option<&StoreRequest> {
        match self {
            Self::Action(BridgeAction::QueryDatabase(req)) => Some(req),
            Self::Control(_) => None,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<ControlMessage> for BridgeMessage {
    fn from(control: ControlMessage) -> Self {
        Self::Control(control)
    }
}

/// Correlation token pairing a duplex request with its reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(String);

impl InvocationId {
    /// Fresh random (UUID v4) id; collisions within one connection are
    /// practically impossible.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InvocationId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One frame on the duplex channel.
///
/// Requests and notifications carry the bridge `channel` tag; replies carry
/// only the `invocation` they answer and the result as `message`, or an
/// `error` when the request failed on the far side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplexFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub message: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation: Option<InvocationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DuplexFrame {
    /// Request expecting a reply tagged with `invocation`.
    #[must_use]
    pub fn request(message: &BridgeMessage, invocation: InvocationId) -> Self {
        Self {
            channel: Some(BRIDGE_CHANNEL.to_owned()),
            message: message.to_value(),
            invocation: Some(invocation),
            error: None,
        }
    }

    /// Fire-and-forget message.
    #[must_use]
    pub fn notification(message: &BridgeMessage) -> Self {
        Self {
            channel: Some(BRIDGE_CHANNEL.to_owned()),
            message: message.to_value(),
            invocation: None,
            error: None,
        }
    }

    #[must_use]
    pub const fn reply(invocation: InvocationId, message: Value) -> Self {
        Self { channel: None, message, invocation: Some(invocation), error: None }
    }

    /// Reply reporting that the request failed.
    #[must_use]
    pub fn failure(invocation: InvocationId, error: impl Into<String>) -> Self {
        Self { channel: None, message: Value::Null, invocation: Some(invocation), error: Some(error.into()) }
    }

    /// Whether the frame is tagged for the bridge channel.
    #[must_use]
    pub fn on_bridge_channel(&self) -> bool {
        self.channel.as_deref() == Some(BRIDGE_CHANNEL)
    }

    /// Whether the frame is a reply (untagged, but correlated).
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.channel.is_none() && self.invocation.is_some()
    }
}
