//! Cross-context bridge for the enhancer settings store
//!
//! Carries store requests and control messages between execution contexts
//! over a request/response channel ([`invoke`]) and a correlated duplex
//! channel ([`duplex`]), and keeps the injected user script in sync with
//! stored settings.

pub mod assets;
pub mod collab;
mod config;
pub mod duplex;
mod error;
mod handler;
pub mod invoke;
pub mod session;
pub mod stdio;
#[cfg(test)]
mod testing;
pub mod userscript;

pub use assets::{enhancer_base_url, resolve_enhancer_asset};
pub use collab::{AppContext, AppControl, LogAppControl, NoScriptHost, ScriptHost, UserScript};
pub use config::BridgeConfig;
pub use duplex::{ContextId, Coordinator, CoordinatorHandle, DuplexClient, Port, port_pair};
pub use error::{BridgeError, Result};
pub use handler::RequestHandler;
pub use invoke::{InvokeClient, InvokeServer, invoke_channel};
pub use session::{MenuDelivery, MenuState, MenuTarget};
pub use userscript::{SyncOutcome, UserScriptSync};
