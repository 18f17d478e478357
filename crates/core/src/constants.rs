//! Shared constants for the enhancer.
//!
//! Keys and identifiers that more than one crate has to agree on.

/// Channel tag carried by every duplex frame.
pub const BRIDGE_CHANNEL: &str = "app-bridge";

/// Root-scope key holding the id of the selected profile.
pub const ACTIVE_PROFILE_KEY: &str = "activeProfile";

/// Root-scope key holding every known profile id, in creation order.
pub const PROFILE_IDS_KEY: &str = "profileIds";

/// Profile used when neither an active nor any known profile exists.
pub const DEFAULT_PROFILE_ID: &str = "default";

/// Module id of the core mod, whose options hold the custom script.
pub const CORE_MOD_ID: &str = "0f0bf8b6-eae6-4273-b307-8fc43f2ee082";

/// Option key (and user script id) of the custom script.
pub const CUSTOM_SCRIPT_KEY: &str = "customScript";

/// Keys whose `set` re-derives the injected user script.
pub const USER_SCRIPT_WATCH_LIST: [&str; 2] = [ACTIVE_PROFILE_KEY, CUSTOM_SCRIPT_KEY];

/// Default page-match patterns for the injected user script.
pub const DEFAULT_SCRIPT_MATCHES: &str = "*://*.notion.so/*";

/// Base URL of the host application's UI.
pub const DEFAULT_APP_URL: &str = "https://www.notion.so";

/// Path segment under the app URL where enhancer assets are served.
pub const ENHANCER_ASSET_PATH: &str = "__notion-enhancer";

/// Name of the SQLite table backing the desktop store.
pub const KV_TABLE: &str = "kvstore";

/// Default SQLite connection pool size.
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;

/// Default duplex request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
