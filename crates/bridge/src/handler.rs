//! Request handling shared by both transports.

use std::sync::Arc;

use enhancer_core::{ControlMessage, StoreRequest};
use enhancer_storage::KvStore;
use serde_json::Value;

use crate::collab::{AppControl, ScriptHost};
use crate::config::BridgeConfig;
use crate::duplex::ContextId;
use crate::userscript::{UserScriptSync, affects_user_script};
use crate::{BridgeError, Result};

/// Serves store queries and control messages for one execution context.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    store: Arc<KvStore>,
    scripts: UserScriptSync,
    app: Arc<dyn AppControl>,
}

impl RequestHandler {
    pub fn new(
        store: Arc<KvStore>,
        script_host: Arc<dyn ScriptHost>,
        app: Arc<dyn AppControl>,
        config: &BridgeConfig,
    ) -> Self {
        let scripts =
            UserScriptSync::new(Arc::clone(&store), script_host, config.script_matches.clone());
        Self { store, scripts, app }
    }

    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }

    pub fn scripts(&self) -> &UserScriptSync {
        &self.scripts
    }

    /// Run a store request and return its reply value.
    ///
    /// # Errors
    /// Returns error if the store operation fails.
    pub async fn execute(&self, request: &StoreRequest) -> Result<Value> {
        Ok(self.store.query(request).await?)
    }

    /// Follow-up work after a request has been answered: re-derive the
    /// user script when the request could have changed it. Failures are
    /// logged, the reply already went out.
    pub async fn after_reply(&self, request: &StoreRequest) {
        if !affects_user_script(request) {
            return;
        }
        if let Err(e) = self.scripts.sync().await {
            tracing::warn!(error = %e, query = %request.query(), "user script sync failed");
        }
    }

    /// Register whatever custom script is already stored. Run once before
    /// serving; failures are logged.
    pub async fn sync_on_start(&self) {
        if let Err(e) = self.scripts.sync().await {
            tracing::warn!(error = %e, "startup user script sync failed");
        }
    }

    /// Context the menu opens in when `ctx` asks for it.
    ///
    /// # Errors
    /// Returns error if the host cannot list or open contexts.
    pub async fn menu_context(&self, ctx: ContextId) -> Result<ContextId> {
        self.app
            .find_or_open_app_context(ctx)
            .await
            .map_err(|e| BridgeError::AppControl(e.to_string()))
    }

    /// Act on a control message. Only `reload-app` does anything here.
    ///
    /// # Errors
    /// Returns error if the host application rejects the reload.
    pub async fn control(&self, message: ControlMessage) -> Result<()> {
        match message {
            ControlMessage::ReloadApp => self
                .app
                .reload_app()
                .await
                .map_err(|e| BridgeError::AppControl(e.to_string())),
            ControlMessage::LoadComplete | ControlMessage::OpenMenu => {
                tracing::debug!(?message, "control message without a handler here");
                Ok(())
            },
        }
    }
}
