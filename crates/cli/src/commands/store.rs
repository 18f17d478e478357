use anyhow::{Context, Result};
use enhancer_core::Namespace;
use enhancer_storage::KvStore;
use serde_json::{Map, Value};
use std::path::Path;

/// Command-line values are JSON when they parse as JSON, plain strings
/// otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) async fn get(
    store: &KvStore,
    namespace: &Namespace,
    key: &str,
    fallback: Option<&str>,
) -> Result<()> {
    let mut fallbacks = Map::new();
    if let Some(raw) = fallback {
        fallbacks.insert(key.to_owned(), parse_value(raw));
    }
    let value = store.get(namespace, key, &fallbacks).await?;
    print_json(&value.unwrap_or(Value::Null))
}

pub(crate) async fn set(store: &KvStore, namespace: &Namespace, key: &str, raw: &str) -> Result<()> {
    let written = store.set(namespace, key, &parse_value(raw)).await?;
    tracing::debug!(key = %namespace.resolve(key), "value stored");
    print_json(&Value::Bool(written))
}

pub(crate) async fn remove(store: &KvStore, namespace: &Namespace, keys: &[String]) -> Result<()> {
    print_json(&Value::Bool(store.remove(namespace, keys).await?))
}

pub(crate) async fn export(store: &KvStore, namespace: &Namespace) -> Result<()> {
    print_json(&Value::Object(store.export(namespace).await?))
}

pub(crate) async fn import(store: &KvStore, namespace: &Namespace, file: &Path) -> Result<()> {
    let text = if file == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?
    };
    let obj: Map<String, Value> =
        serde_json::from_str(&text).context("import expects a JSON object")?;
    let count = obj.len();
    let written = store.import(namespace, obj).await?;
    tracing::info!(count, namespace = %namespace, "imported values");
    print_json(&Value::Bool(written))
}
