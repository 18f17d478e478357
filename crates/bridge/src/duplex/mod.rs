//! Long-lived bidirectional channel between content contexts and the host.
//!
//! Each content context holds a [`DuplexClient`] over its [`Port`]; the host
//! runs one [`Coordinator`] for all of them.

mod client;
mod coordinator;
mod port;

pub use client::DuplexClient;
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use port::{ContextId, Port, port_pair};
