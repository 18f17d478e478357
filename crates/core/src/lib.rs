//! Core types for the enhancer settings store
//!
//! Namespace resolution, the `{namespace, query, args}` request envelope and
//! the bridge message shapes shared by every execution context.

pub mod constants;
mod env_config;
mod error;
mod namespace;
mod request;

pub use env_config::{default_db_path, env_list_with_default, env_parse_with_default};
pub use error::*;
pub use namespace::{NAMESPACE_SEPARATOR, Namespace};
pub use request::*;
