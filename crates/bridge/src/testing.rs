//! Recording collaborators for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::Result;
use crate::collab::{AppContext, AppControl, ScriptHost, UserScript};
use crate::duplex::ContextId;

#[derive(Debug, Default)]
pub(crate) struct RecordingScriptHost {
    unavailable: bool,
    scripts: Mutex<Vec<UserScript>>,
    gets: AtomicUsize,
    registers: AtomicUsize,
    updates: AtomicUsize,
}

impl RecordingScriptHost {
    pub(crate) fn available() -> Self {
        Self::default()
    }

    pub(crate) fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn register_calls(&self) -> usize {
        self.registers.load(Ordering::SeqCst)
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub(crate) fn registered_code(&self) -> Option<String> {
        self.scripts.lock().unwrap().first().map(|s| s.code.clone())
    }

    fn store(&self, scripts: Vec<UserScript>) {
        let mut current = self.scripts.lock().unwrap();
        for script in scripts {
            current.retain(|s| s.id != script.id);
            current.push(script);
        }
    }
}

#[async_trait]
impl ScriptHost for RecordingScriptHost {
    fn available(&self) -> bool {
        !self.unavailable
    }

    async fn get_scripts(&self, ids: &[String]) -> Result<Vec<UserScript>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let current = self.scripts.lock().unwrap();
        Ok(current.iter().filter(|s| ids.contains(&s.id)).cloned().collect())
    }

    async fn register(&self, scripts: Vec<UserScript>) -> Result<()> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        self.store(scripts);
        Ok(())
    }

    async fn update(&self, scripts: Vec<UserScript>) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.store(scripts);
        Ok(())
    }
}

/// App control over an in-memory list of contexts.
#[derive(Debug, Default)]
pub(crate) struct RecordingAppControl {
    contexts: Mutex<Vec<AppContext>>,
    opened: Mutex<Vec<String>>,
    focused: Mutex<Vec<ContextId>>,
    reloaded: Mutex<Vec<ContextId>>,
}

impl RecordingAppControl {
    pub(crate) fn with_contexts<'a>(contexts: impl IntoIterator<Item = (ContextId, &'a str)>) -> Self {
        let contexts =
            contexts.into_iter().map(|(id, url)| AppContext { id, url: url.to_owned() }).collect();
        Self { contexts: Mutex::new(contexts), ..Self::default() }
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub(crate) fn focused(&self) -> Vec<ContextId> {
        self.focused.lock().unwrap().clone()
    }

    pub(crate) fn reloaded(&self) -> Vec<ContextId> {
        self.reloaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppControl for RecordingAppControl {
    fn app_url(&self) -> String {
        "https://www.notion.so".to_owned()
    }

    async fn contexts(&self) -> Result<Vec<AppContext>> {
        Ok(self.contexts.lock().unwrap().clone())
    }

    async fn open_context(&self, url: &str) -> Result<ContextId> {
        self.opened.lock().unwrap().push(url.to_owned());
        let mut contexts = self.contexts.lock().unwrap();
        let id = 100 + contexts.len() as ContextId;
        contexts.push(AppContext { id, url: url.to_owned() });
        Ok(id)
    }

    async fn focus_context(&self, ctx: ContextId) -> Result<()> {
        self.focused.lock().unwrap().push(ctx);
        Ok(())
    }

    async fn reload_context(&self, ctx: ContextId) -> Result<()> {
        self.reloaded.lock().unwrap().push(ctx);
        Ok(())
    }
}
