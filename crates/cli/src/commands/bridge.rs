use anyhow::{Result, bail};
use enhancer_bridge::{
    AppControl, BridgeConfig, Coordinator, LogAppControl, NoScriptHost, RequestHandler, ScriptHost,
    resolve_enhancer_asset, stdio::run_stdio_bridge,
};
use enhancer_storage::KvStore;
use std::path::Path;
use std::sync::Arc;

pub(crate) async fn run(store: KvStore, context: u64) -> Result<()> {
    let config = BridgeConfig::from_env();
    let handler = RequestHandler::new(
        Arc::new(store),
        Arc::new(NoScriptHost) as Arc<dyn ScriptHost>,
        Arc::new(LogAppControl::default().with_context(context)) as Arc<dyn AppControl>,
        &config,
    );
    let coordinator = Coordinator::spawn(handler);
    run_stdio_bridge(&coordinator, context).await?;
    Ok(())
}

/// Print the local file an enhancer asset URL is served from.
pub(crate) fn asset(url: &str, root: &Path) -> Result<()> {
    let base = LogAppControl::default().enhancer_url();
    let Some(path) = resolve_enhancer_asset(url, &base, root) else {
        bail!("{url} is not an enhancer asset under {base}");
    };
    println!("{}", path.display());
    Ok(())
}
