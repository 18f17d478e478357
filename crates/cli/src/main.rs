use anyhow::Result;
use clap::{Parser, Subcommand};
use enhancer_core::constants::DEFAULT_DB_POOL_SIZE;
use enhancer_core::{Namespace, default_db_path, env_parse_with_default};
use enhancer_storage::{BackendKind, KvStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "enhancer")]
#[command(about = "Inspect and edit notion-enhancer settings", long_about = None)]
struct Cli {
    /// SQLite store to use (default: $ENHANCER_DB_PATH or the local data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Namespace scope; repeat for nested scopes
    #[arg(short, long = "namespace", global = true)]
    namespace: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under KEY
    Get {
        key: String,
        /// JSON value printed when nothing is stored
        #[arg(short, long)]
        fallback: Option<String>,
    },
    /// Store VALUE (JSON, or a plain string) under KEY
    Set { key: String, value: String },
    /// Delete one or more keys
    Remove {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Print every raw value in the namespace as one JSON object
    Export,
    /// Load a JSON object produced by `export` (path or `-` for stdin)
    Import { file: PathBuf },
    /// Serve the duplex protocol on stdin/stdout
    Bridge {
        /// Context id of this connection
        #[arg(short, long, default_value = "0")]
        context: u64,
    },
    /// Print the local file an enhancer asset URL maps to
    Asset {
        url: String,
        /// Directory the enhancer's files are installed in
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn get_db_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("ENHANCER_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let db_path = get_db_path(cli.db);
    ensure_db_dir(&db_path)?;

    let pool_size = env_parse_with_default("ENHANCER_DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE);
    let store = KvStore::new(BackendKind::Sqlite { path: db_path, pool_size });
    let namespace = Namespace::from_scopes(&cli.namespace);

    match cli.command {
        Commands::Get { key, fallback } => {
            commands::store::get(&store, &namespace, &key, fallback.as_deref()).await?;
        },
        Commands::Set { key, value } => commands::store::set(&store, &namespace, &key, &value).await?,
        Commands::Remove { keys } => commands::store::remove(&store, &namespace, &keys).await?,
        Commands::Export => commands::store::export(&store, &namespace).await?,
        Commands::Import { file } => commands::store::import(&store, &namespace, &file).await?,
        Commands::Bridge { context } => commands::bridge::run(store, context).await?,
        Commands::Asset { url, root } => commands::bridge::asset(&url, &root)?,
    }

    Ok(())
}
