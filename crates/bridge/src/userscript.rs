//! Derived-state synchronizer for the custom user script.
//!
//! The custom script lives in the core mod's options of the active profile.
//! After writes that can change it, the registered user script is brought in
//! line with the stored content.

use std::sync::Arc;

use enhancer_core::constants::{
    ACTIVE_PROFILE_KEY, CORE_MOD_ID, CUSTOM_SCRIPT_KEY, DEFAULT_PROFILE_ID, PROFILE_IDS_KEY,
    USER_SCRIPT_WATCH_LIST,
};
use enhancer_core::{Namespace, Query, StoreRequest};
use enhancer_storage::KvStore;
use serde_json::{Map, Value};

use crate::Result;
use crate::collab::{ScriptHost, UserScript};

/// What a sync pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Script injection is unavailable in this context.
    Unavailable,
    /// The registered script already matches (or nothing to register).
    Unchanged,
    Registered,
    Updated,
    /// Stored content became empty; the old registration is left in place.
    LeftStale,
}

/// Whether `request` can change the derived script.
#[must_use]
pub fn affects_user_script(request: &StoreRequest) -> bool {
    match request.query() {
        Query::Import => true,
        Query::Set => request.key().is_some_and(|key| USER_SCRIPT_WATCH_LIST.contains(&key)),
        _ => false,
    }
}

/// Keeps the `customScript` user script in sync with the store.
#[derive(Debug, Clone)]
pub struct UserScriptSync {
    store: Arc<KvStore>,
    host: Arc<dyn ScriptHost>,
    matches: Vec<String>,
}

impl UserScriptSync {
    pub fn new(store: Arc<KvStore>, host: Arc<dyn ScriptHost>, matches: Vec<String>) -> Self {
        Self { store, host, matches }
    }

    /// Profile whose custom script applies: the active profile, else the
    /// first known profile, else the default id.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub async fn active_profile(&self) -> Result<String> {
        let root = Namespace::root();
        let none = Map::new();
        if let Some(Value::String(id)) = self.store.get(&root, ACTIVE_PROFILE_KEY, &none).await? {
            return Ok(id);
        }
        let first_known = self
            .store
            .get(&root, PROFILE_IDS_KEY, &none)
            .await?
            .and_then(|ids| ids.get(0).and_then(Value::as_str).map(ToOwned::to_owned));
        Ok(first_known.unwrap_or_else(|| DEFAULT_PROFILE_ID.to_owned()))
    }

    /// Script source derived from the store; empty when none is set.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub async fn derive_code(&self) -> Result<String> {
        let profile = self.active_profile().await?;
        let ns = Namespace::from([profile.as_str(), CORE_MOD_ID]);
        let script = self.store.get(&ns, CUSTOM_SCRIPT_KEY, &Map::new()).await?;
        Ok(script
            .as_ref()
            .and_then(|s| s.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned())
    }

    /// Re-derive the script and register or update it when it changed.
    ///
    /// # Errors
    /// Returns error if the store or the script host fails.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        if !self.host.available() {
            return Ok(SyncOutcome::Unavailable);
        }
        let code = self.derive_code().await?;
        let existing = self.host.get_scripts(&[CUSTOM_SCRIPT_KEY.to_owned()]).await?;

        let outcome = match existing.first() {
            Some(current) if current.code == code => SyncOutcome::Unchanged,
            // TODO: unregister once the host API exposes removal by id.
            Some(_) if code.is_empty() => SyncOutcome::LeftStale,
            Some(_) => {
                self.host.update(vec![self.script(code)]).await?;
                SyncOutcome::Updated
            },
            None if code.is_empty() => SyncOutcome::Unchanged,
            None => {
                self.host.register(vec![self.script(code)]).await?;
                SyncOutcome::Registered
            },
        };
        tracing::debug!(?outcome, "user script sync");
        Ok(outcome)
    }

    fn script(&self, code: String) -> UserScript {
        UserScript { id: CUSTOM_SCRIPT_KEY.to_owned(), matches: self.matches.clone(), code }
    }
}
