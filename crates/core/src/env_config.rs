//! Environment variable parsing with warn-level logging for invalid values.

use std::path::PathBuf;

/// Parse an environment variable with a default fallback.
///
/// - If the variable is not set: returns `default` silently (expected case).
/// - If the variable is set but cannot be parsed: logs a warning and returns `default`.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    parse_with_default(var, std::env::var(var).ok(), default)
}

/// Comma-separated list from an environment variable, or `default` when the
/// variable is unset or holds no non-blank entries.
pub fn env_list_with_default(var: &str, default: &[&str]) -> Vec<String> {
    list_with_default(std::env::var(var).ok(), default)
}

/// Default location of the desktop SQLite store.
#[must_use]
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notion-enhancer")
        .join("notion-enhancer.db")
}

fn parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        Some(v) => match v.parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        None => default,
    }
}

fn list_with_default(raw: Option<String>, default: &[&str]) -> Vec<String> {
    let items: Vec<String> = raw
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if items.is_empty() { default.iter().map(|s| (*s).to_owned()).collect() } else { items }
}
