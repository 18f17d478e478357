//! Bridge settings read from the environment.

use std::time::Duration;

use enhancer_core::constants::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SCRIPT_MATCHES};
use enhancer_core::{env_list_with_default, env_parse_with_default};

/// Runtime settings for the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// How long a duplex request waits for its reply.
    pub request_timeout: Duration,
    /// Page-match patterns of the injected user script.
    pub script_matches: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            script_matches: vec![DEFAULT_SCRIPT_MATCHES.to_owned()],
        }
    }
}

impl BridgeConfig {
    /// Settings from `ENHANCER_REQUEST_TIMEOUT_MS` and `ENHANCER_SCRIPT_MATCHES`.
    #[must_use]
    pub fn from_env() -> Self {
        let timeout_ms =
            env_parse_with_default("ENHANCER_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS);
        Self {
            request_timeout: Duration::from_millis(timeout_ms),
            script_matches: env_list_with_default(
                "ENHANCER_SCRIPT_MATCHES",
                &[DEFAULT_SCRIPT_MATCHES],
            ),
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
