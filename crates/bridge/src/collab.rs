//! Host collaborators the bridge drives but does not implement.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use enhancer_core::constants::DEFAULT_APP_URL;

use crate::Result;
use crate::assets::enhancer_base_url;
use crate::duplex::ContextId;

/// A user script registered with the host against page-match patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScript {
    pub id: String,
    pub matches: Vec<String>,
    pub code: String,
}

/// Host API for registering user scripts.
#[async_trait]
pub trait ScriptHost: Send + Sync + Debug {
    /// Whether script injection is usable in this execution context.
    fn available(&self) -> bool;

    /// Registered scripts with the given ids.
    async fn get_scripts(&self, ids: &[String]) -> Result<Vec<UserScript>>;

    async fn register(&self, scripts: Vec<UserScript>) -> Result<()>;

    async fn update(&self, scripts: Vec<UserScript>) -> Result<()>;
}

/// A tab or window known to the host, with the URL it currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub id: ContextId,
    pub url: String,
}

/// Host application controls.
///
/// Hosts supply the context primitives; reloading the app and choosing
/// where the menu opens are built on top of them.
#[async_trait]
pub trait AppControl: Send + Sync + Debug {
    /// Base URL the host application's UI is currently served from.
    fn app_url(&self) -> String;

    /// Contexts of the current window, in display order.
    async fn contexts(&self) -> Result<Vec<AppContext>>;

    /// Open a new context showing `url`.
    async fn open_context(&self, url: &str) -> Result<ContextId>;

    /// Bring `ctx` to the front.
    async fn focus_context(&self, ctx: ContextId) -> Result<()>;

    async fn reload_context(&self, ctx: ContextId) -> Result<()>;

    /// Whether `url` is a page of the host application.
    fn is_app_url(&self, url: &str) -> bool {
        let base = self.app_url();
        url.strip_prefix(base.trim_end_matches('/'))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
    }

    /// Base URL of the enhancer's own assets inside the app.
    fn enhancer_url(&self) -> String {
        enhancer_base_url(&self.app_url())
    }

    /// Reload every context showing the app. Other contexts are left alone.
    async fn reload_app(&self) -> Result<()> {
        for context in self.contexts().await? {
            if self.is_app_url(&context.url) {
                self.reload_context(context.id).await?;
            }
        }
        Ok(())
    }

    /// Context the menu should open in when requested from `ctx`: `ctx`
    /// itself if it shows the app, else the first app context, else a newly
    /// opened one. The chosen context is brought to the front.
    async fn find_or_open_app_context(&self, ctx: ContextId) -> Result<ContextId> {
        let contexts = self.contexts().await?;
        let existing = contexts
            .iter()
            .find(|c| c.id == ctx && self.is_app_url(&c.url))
            .or_else(|| contexts.iter().find(|c| self.is_app_url(&c.url)))
            .map(|c| c.id);
        let target = match existing {
            Some(id) => id,
            None => self.open_context(&self.app_url()).await?,
        };
        self.focus_context(target).await?;
        Ok(target)
    }
}

/// Script host for contexts without script injection, such as the desktop
/// host process.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScriptHost;

#[async_trait]
impl ScriptHost for NoScriptHost {
    fn available(&self) -> bool {
        false
    }

    async fn get_scripts(&self, _ids: &[String]) -> Result<Vec<UserScript>> {
        Ok(Vec::new())
    }

    async fn register(&self, _scripts: Vec<UserScript>) -> Result<()> {
        Ok(())
    }

    async fn update(&self, _scripts: Vec<UserScript>) -> Result<()> {
        Ok(())
    }
}

/// App control for a host with a single app window, `context`. Requests
/// are only recorded in the log.
#[derive(Debug, Clone)]
pub struct LogAppControl {
    url: String,
    context: ContextId,
}

impl LogAppControl {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), context: 0 }
    }

    #[must_use]
    pub fn with_context(mut self, context: ContextId) -> Self {
        self.context = context;
        self
    }
}

impl Default for LogAppControl {
    fn default() -> Self {
        Self::new(DEFAULT_APP_URL)
    }
}

#[async_trait]
impl AppControl for LogAppControl {
    fn app_url(&self) -> String {
        self.url.clone()
    }

    async fn contexts(&self) -> Result<Vec<AppContext>> {
        Ok(vec![AppContext { id: self.context, url: self.url.clone() }])
    }

    async fn open_context(&self, url: &str) -> Result<ContextId> {
        tracing::info!(url, ctx = self.context, "reusing the app window");
        Ok(self.context)
    }

    async fn focus_context(&self, ctx: ContextId) -> Result<()> {
        tracing::debug!(ctx, "focus requested");
        Ok(())
    }

    async fn reload_context(&self, ctx: ContextId) -> Result<()> {
        tracing::info!(url = %self.url, ctx, "reload requested by a connected context");
        Ok(())
    }
}
