#[cfg(test)]
mod store_tests {
    #![expect(clippy::unwrap_used, reason = "test code")]

    use std::sync::Arc;

    use enhancer_core::{Namespace, StoreRequest};
    use serde_json::{Map, Value, json};
    use tempfile::TempDir;

    use crate::{BackendKind, KvStore, MemoryStorageArea};

    fn create_sqlite_store() -> (KvStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let kind = BackendKind::Sqlite { path: temp_dir.path().join("test.db"), pool_size: 2 };
        (KvStore::new(kind), temp_dir)
    }

    fn create_host_store() -> KvStore {
        KvStore::new(BackendKind::Host(Arc::new(MemoryStorageArea::new())))
    }

    /// Runs `check` once against each backend.
    async fn for_each_backend<F, Fut>(check: F)
    where
        F: Fn(KvStore) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let (sqlite, _temp_dir) = create_sqlite_store();
        check(sqlite).await;
        check(create_host_store()).await;
    }

    fn no_fallbacks() -> Map<String, Value> {
        Map::new()
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        for_each_backend(|store| async move {
            let ns = Namespace::from(["p1", "mod"]);
            let value = json!({ "nested": [1, "two", null, { "three": 3.5 }], "flag": true });
            assert!(store.set(&ns, "opts", &value).await.unwrap());
            assert_eq!(store.get(&ns, "opts", &no_fallbacks()).await.unwrap(), Some(value));
        })
        .await;
    }

    #[tokio::test]
    async fn test_get_miss_uses_fallback_by_local_key() {
        for_each_backend(|store| async move {
            let ns = Namespace::from("p1");
            let mut fallbacks = Map::new();
            fallbacks.insert("theme".to_owned(), json!("dark"));
            assert_eq!(store.get(&ns, "theme", &fallbacks).await.unwrap(), Some(json!("dark")));
            assert_eq!(store.get(&ns, "other", &fallbacks).await.unwrap(), None);

            store.set(&ns, "theme", &json!("light")).await.unwrap();
            assert_eq!(store.get(&ns, "theme", &fallbacks).await.unwrap(), Some(json!("light")));
        })
        .await;
    }

    #[tokio::test]
    async fn test_stored_null_falls_back() {
        for_each_backend(|store| async move {
            let ns = Namespace::root();
            let mut fallbacks = Map::new();
            fallbacks.insert("k".to_owned(), json!(1));
            store.set(&ns, "k", &Value::Null).await.unwrap();
            assert_eq!(store.get(&ns, "k", &fallbacks).await.unwrap(), Some(json!(1)));
        })
        .await;
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        for_each_backend(|store| async move {
            let a = Namespace::from("a");
            let b = Namespace::from("b");
            store.set(&a, "k", &json!(1)).await.unwrap();
            store.set(&b, "k", &json!(2)).await.unwrap();
            assert_eq!(store.get(&a, "k", &no_fallbacks()).await.unwrap(), Some(json!(1)));
            assert_eq!(store.get(&b, "k", &no_fallbacks()).await.unwrap(), Some(json!(2)));
            assert_eq!(store.get(&Namespace::root(), "a__k", &no_fallbacks()).await.unwrap(), Some(json!(1)));
        })
        .await;
    }

    #[tokio::test]
    async fn test_set_overwrites_single_record() {
        for_each_backend(|store| async move {
            let ns = Namespace::from("p");
            store.set(&ns, "k", &json!(1)).await.unwrap();
            store.set(&ns, "k", &json!(2)).await.unwrap();
            let exported = store.export(&ns).await.unwrap();
            assert_eq!(exported.len(), 1);
            assert_eq!(store.get(&ns, "k", &no_fallbacks()).await.unwrap(), Some(json!(2)));
        })
        .await;
    }

    #[tokio::test]
    async fn test_remove_many_and_missing() {
        for_each_backend(|store| async move {
            let ns = Namespace::from("p");
            store.set(&ns, "k1", &json!("a")).await.unwrap();
            store.set(&ns, "k2", &json!("b")).await.unwrap();
            store.set(&ns, "k3", &json!("c")).await.unwrap();
            assert!(store.remove(&ns, &["k1", "k2", "never-set"]).await.unwrap());
            assert_eq!(store.get(&ns, "k1", &no_fallbacks()).await.unwrap(), None);
            assert_eq!(store.get(&ns, "k2", &no_fallbacks()).await.unwrap(), None);
            assert_eq!(store.get(&ns, "k3", &no_fallbacks()).await.unwrap(), Some(json!("c")));
        })
        .await;
    }

    #[tokio::test]
    async fn test_export_strips_prefix_and_scopes() {
        for_each_backend(|store| async move {
            let ns = Namespace::from(["p1", "m"]);
            store.set(&ns, "a", &json!(1)).await.unwrap();
            store.set(&ns, "b", &json!("x")).await.unwrap();
            store.set(&Namespace::from("p2"), "a", &json!(9)).await.unwrap();

            let exported = store.export(&ns).await.unwrap();
            let mut keys: Vec<&String> = exported.keys().collect();
            keys.sort();
            assert_eq!(keys, vec!["a", "b"]);
        })
        .await;
    }

    #[tokio::test]
    async fn test_export_values_are_raw() {
        let (sqlite, _temp_dir) = create_sqlite_store();
        let ns = Namespace::from("p");
        sqlite.set(&ns, "k", &json!({ "x": 1 })).await.unwrap();
        assert_eq!(sqlite.export(&ns).await.unwrap()["k"], json!("{\"x\":1}"));

        let host = create_host_store();
        host.set(&ns, "k", &json!({ "x": 1 })).await.unwrap();
        assert_eq!(host.export(&ns).await.unwrap()["k"], json!({ "x": 1 }));
    }

    #[tokio::test]
    async fn test_export_import_round_trip_into_empty_store() {
        let (source, _src_dir) = create_sqlite_store();
        let ns = Namespace::from(["p1", "m"]);
        source.set(&ns, "a", &json!([1, 2])).await.unwrap();
        source.set(&ns, "b", &json!({ "c": "d" })).await.unwrap();
        source.set(&Namespace::from("elsewhere"), "z", &json!(0)).await.unwrap();
        let exported = source.export(&ns).await.unwrap();

        let (target, _dst_dir) = create_sqlite_store();
        assert!(target.import(&ns, exported.clone()).await.unwrap());
        assert_eq!(target.export(&ns).await.unwrap(), exported);
        assert_eq!(target.get(&ns, "a", &no_fallbacks()).await.unwrap(), Some(json!([1, 2])));
        assert!(target.export(&Namespace::from("elsewhere")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_into_other_namespace() {
        for_each_backend(|store| async move {
            let from = Namespace::from("p1");
            let to = Namespace::from("p2");
            store.set(&from, "font", &json!("Inter")).await.unwrap();
            let exported = store.export(&from).await.unwrap();
            store.import(&to, exported).await.unwrap();
            assert_eq!(store.get(&to, "font", &no_fallbacks()).await.unwrap(), Some(json!("Inter")));
        })
        .await;
    }

    #[tokio::test]
    async fn test_corrupt_text_reads_as_miss() {
        let (store, _temp_dir) = create_sqlite_store();
        let ns = Namespace::from("p");
        let mut obj = Map::new();
        obj.insert("k".to_owned(), json!("{definitely not json"));
        store.import(&ns, obj).await.unwrap();

        let mut fallbacks = Map::new();
        fallbacks.insert("k".to_owned(), json!("fallback"));
        assert_eq!(store.get(&ns, "k", &fallbacks).await.unwrap(), Some(json!("fallback")));
    }

    #[tokio::test]
    async fn test_query_dispatch_replies() {
        for_each_backend(|store| async move {
            let set = StoreRequest::set(["p", "m"], "k", json!(7));
            assert_eq!(store.query(&set).await.unwrap(), json!(true));
            let get = StoreRequest::get(["p", "m"], "k");
            assert_eq!(store.query(&get).await.unwrap(), json!(7));
            let miss = StoreRequest::get(["p", "m"], "nope");
            assert_eq!(store.query(&miss).await.unwrap(), Value::Null);
            let export = StoreRequest::export(["p", "m"]);
            assert!(store.query(&export).await.unwrap().get("k").is_some());
            let remove = StoreRequest::remove(["p", "m"], ["k"]);
            assert_eq!(store.query(&remove).await.unwrap(), json!(true));
            assert_eq!(store.query(&get).await.unwrap(), Value::Null);
        })
        .await;
    }

    #[tokio::test]
    async fn test_backend_open_failure_reaches_first_caller() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("dir").join("test.db");
        let store = KvStore::new(BackendKind::Sqlite { path, pool_size: 1 });

        let err = store.get(&Namespace::root(), "k", &no_fallbacks()).await.unwrap_err();
        assert!(err.is_init());
        // Not memoized as a success: later callers see the failure too.
        assert!(store.set(&Namespace::root(), "k", &json!(1)).await.unwrap_err().is_init());
    }

    #[tokio::test]
    async fn test_backend_is_opened_once() {
        let (store, _temp_dir) = create_sqlite_store();
        let first = Arc::as_ptr(store.backend().await.unwrap()).cast::<()>();
        let second = Arc::as_ptr(store.backend().await.unwrap()).cast::<()>();
        assert_eq!(first, second);
    }
}
