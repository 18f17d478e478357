//! Namespace resolution.
//!
//! A namespace is an ordered path of scope identifiers (profile id, mod id)
//! flattened into a key prefix, so identical local keys in different scopes
//! never collide.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Separator placed between scope identifiers and before the local key.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Flattened namespace. The empty namespace is the root scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace {
    joined: String,
}

impl Namespace {
    /// The root scope.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Namespace from an ordered path of scope identifiers.
    pub fn from_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = scopes.into_iter().map(|s| s.as_ref().to_owned()).collect();
        Self { joined: parts.join(NAMESPACE_SEPARATOR) }
    }

    /// Whether this is the root scope.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.joined.is_empty()
    }

    /// Key prefix: the joined scopes plus a trailing separator, or `""` at root.
    #[must_use]
    pub fn prefix(&self) -> String {
        if self.joined.is_empty() {
            String::new()
        } else {
            format!("{}{NAMESPACE_SEPARATOR}", self.joined)
        }
    }

    /// Fully-qualified key for `key`.
    ///
    /// Keys that already carry the prefix are returned unchanged, so
    /// resolving twice is the same as resolving once.
    #[must_use]
    pub fn resolve(&self, key: &str) -> String {
        let prefix = self.prefix();
        if key.starts_with(&prefix) { key.to_owned() } else { format!("{prefix}{key}") }
    }

    /// Local key for a fully-qualified `key`, or `None` when it lies outside
    /// this namespace.
    #[must_use]
    pub fn strip<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.prefix().as_str())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined)
    }
}

impl From<&str> for Namespace {
    fn from(joined: &str) -> Self {
        Self { joined: joined.to_owned() }
    }
}

impl From<String> for Namespace {
    fn from(joined: String) -> Self {
        Self { joined }
    }
}

impl<S: AsRef<str>> From<&[S]> for Namespace {
    fn from(scopes: &[S]) -> Self {
        Self::from_scopes(scopes)
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Namespace {
    fn from(scopes: [S; N]) -> Self {
        Self::from_scopes(scopes)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamespaceRepr {
    Joined(String),
    Scopes(Vec<String>),
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<NamespaceRepr>::deserialize(deserializer)? {
            None => Self::root(),
            Some(NamespaceRepr::Joined(joined)) => Self::from(joined),
            Some(NamespaceRepr::Scopes(scopes)) => Self::from_scopes(scopes),
        })
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined)
    }
}
