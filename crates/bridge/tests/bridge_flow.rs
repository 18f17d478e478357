//! End-to-end flows over a SQLite-backed store.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use enhancer_bridge::{
    AppControl, BridgeConfig, BridgeError, Coordinator, DuplexClient, LogAppControl, RequestHandler,
    ScriptHost, UserScript, invoke_channel,
};
use enhancer_core::constants::CORE_MOD_ID;
use enhancer_core::{BridgeMessage, Namespace, StoreRequest};
use enhancer_storage::{BackendKind, KvStore};
use serde_json::{Map, json};

#[derive(Debug, Default)]
struct Scripts {
    registered: Mutex<Vec<UserScript>>,
    calls: Mutex<Vec<&'static str>>,
}

#[async_trait]
impl ScriptHost for Scripts {
    fn available(&self) -> bool {
        true
    }

    async fn get_scripts(&self, ids: &[String]) -> enhancer_bridge::Result<Vec<UserScript>> {
        let registered = self.registered.lock().unwrap();
        Ok(registered.iter().filter(|s| ids.contains(&s.id)).cloned().collect())
    }

    async fn register(&self, scripts: Vec<UserScript>) -> enhancer_bridge::Result<()> {
        self.calls.lock().unwrap().push("register");
        self.registered.lock().unwrap().extend(scripts);
        Ok(())
    }

    async fn update(&self, scripts: Vec<UserScript>) -> enhancer_bridge::Result<()> {
        self.calls.lock().unwrap().push("update");
        *self.registered.lock().unwrap() = scripts;
        Ok(())
    }
}

fn sqlite_handler(dir: &tempfile::TempDir, scripts: &Arc<Scripts>) -> RequestHandler {
    let kind = BackendKind::Sqlite { path: dir.path().join("enhancer.db"), pool_size: 2 };
    RequestHandler::new(
        Arc::new(KvStore::new(kind)),
        Arc::clone(scripts) as Arc<dyn ScriptHost>,
        Arc::new(LogAppControl::default()) as Arc<dyn AppControl>,
        &BridgeConfig::default(),
    )
}

#[tokio::test]
async fn test_profile_switch_over_duplex_updates_user_script() {
    let dir = tempfile::tempdir().unwrap();
    let scripts = Arc::new(Scripts::default());
    let coordinator = Coordinator::spawn(sqlite_handler(&dir, &scripts));
    let (client, _notes) =
        DuplexClient::connect(coordinator.connect(1).unwrap(), Duration::from_secs(5));

    for (profile, code) in [("p1", "one()"), ("p2", "two()")] {
        let ns = Namespace::from([profile, CORE_MOD_ID]);
        let set = StoreRequest::set(ns, "customScript", json!({ "content": code }));
        client.query(set).await.unwrap();
    }
    client.query(StoreRequest::set("", "activeProfile", json!("p1"))).await.unwrap();
    client.query(StoreRequest::set("", "activeProfile", json!("p2"))).await.unwrap();
    client.query(StoreRequest::set("", "activeProfile", json!("p2"))).await.unwrap();
    client.query(StoreRequest::get("", "activeProfile")).await.unwrap();

    // Script writes before activeProfile exists resolve to the empty
    // "default" profile and register nothing.
    assert_eq!(*scripts.calls.lock().unwrap(), vec!["register", "update"]);
    let registered = scripts.registered.lock().unwrap();
    assert_eq!(registered[0].code, "two()");
    assert_eq!(registered[0].matches, vec!["*://*.notion.so/*"]);
}

#[tokio::test]
async fn test_import_over_duplex_registers_custom_script_once() {
    let dir = tempfile::tempdir().unwrap();
    let scripts = Arc::new(Scripts::default());
    let coordinator = Coordinator::spawn(sqlite_handler(&dir, &scripts));
    let (client, _notes) =
        DuplexClient::connect(coordinator.connect(1).unwrap(), Duration::from_secs(5));

    client.query(StoreRequest::set("", "activeProfile", json!("p1"))).await.unwrap();
    let mut options = Map::new();
    options.insert("customScript".to_owned(), json!(r#"{"content":"imported()"}"#));
    let import = StoreRequest::import(Namespace::from(["p1", CORE_MOD_ID]), options);

    assert_eq!(client.query(import.clone()).await.unwrap(), json!(true));
    client.query(StoreRequest::get("", "activeProfile")).await.unwrap();
    assert_eq!(*scripts.calls.lock().unwrap(), vec!["register"]);
    assert_eq!(scripts.registered.lock().unwrap()[0].code, "imported()");

    assert_eq!(client.query(import).await.unwrap(), json!(true));
    client.query(StoreRequest::get("", "activeProfile")).await.unwrap();
    assert_eq!(*scripts.calls.lock().unwrap(), vec!["register"]);
}

#[tokio::test]
async fn test_export_import_between_profiles_over_invoke() {
    let dir = tempfile::tempdir().unwrap();
    let scripts = Arc::new(Scripts::default());
    let handler = sqlite_handler(&dir, &scripts);
    let (client, server) = invoke_channel();
    let task = tokio::spawn(async move { server.serve(&handler).await });

    let set = StoreRequest::set("p1", "theme", json!({ "mode": "dark" }));
    client.invoke(&BridgeMessage::query(set)).await.unwrap();

    let exported = client.invoke(&BridgeMessage::query(StoreRequest::export("p1"))).await.unwrap();
    let obj: Map<String, serde_json::Value> =
        serde_json::from_value(exported.unwrap()).unwrap();
    assert_eq!(obj["theme"], json!(r#"{"mode":"dark"}"#));

    let import = StoreRequest::import("p2", obj);
    assert_eq!(client.invoke(&BridgeMessage::query(import)).await.unwrap(), Some(json!(true)));

    let get = StoreRequest::get("p2", "theme");
    let copied = client.invoke(&BridgeMessage::query(get)).await.unwrap();
    assert_eq!(copied, Some(json!({ "mode": "dark" })));

    drop(client);
    task.await.unwrap();
}

#[tokio::test]
async fn test_unopenable_store_fails_request_remotely() {
    let dir = tempfile::tempdir().unwrap();
    let kind = BackendKind::Sqlite { path: dir.path().join("missing/dir/enhancer.db"), pool_size: 1 };
    let handler = RequestHandler::new(
        Arc::new(KvStore::new(kind)),
        Arc::new(Scripts::default()) as Arc<dyn ScriptHost>,
        Arc::new(LogAppControl::default()) as Arc<dyn AppControl>,
        &BridgeConfig::default(),
    );
    let coordinator = Coordinator::spawn(handler);
    let (client, _notes) =
        DuplexClient::connect(coordinator.connect(3).unwrap(), Duration::from_secs(5));

    let err = client.query(StoreRequest::get("", "k")).await.unwrap_err();
    assert!(matches!(err, BridgeError::Remote(_)));
    let err = client.query(StoreRequest::get("", "k")).await.unwrap_err();
    assert!(matches!(err, BridgeError::Remote(_)));
}
