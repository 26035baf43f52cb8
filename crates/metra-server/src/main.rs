use anyhow::Result;
use metra_server::config::ServerConfig;
use metra_server::state::AppState;
use metra_server::app;
use metra_storage::{snapshot, MemStorage, SqliteBackend, Storage, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("metra_server=info".parse()?)
                .add_directive("metra_storage=info".parse()?),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)?;

    tracing::info!(
        addr = %config.listen_addr,
        store_interval_secs = config.store_interval_secs,
        snapshot = %config.snapshot_path,
        restore = config.restore,
        signed = config.sign_key.is_some(),
        backend = config.database_path.as_deref().unwrap_or("none"),
        "metra-server starting"
    );

    let snapshot_path = PathBuf::from(&config.snapshot_path);
    if let Some(parent) = snapshot_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let store = Arc::new(MemStorage::new());
    if config.restore {
        match snapshot::load_from_file(store.as_ref(), &snapshot_path) {
            Ok(()) => tracing::info!(path = %config.snapshot_path, "snapshot restored"),
            Err(StorageError::Io { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::info!(path = %config.snapshot_path, "no snapshot file yet, starting empty");
            }
            // A present-but-unreadable snapshot is fatal at startup.
            Err(e) => return Err(e.into()),
        }
    }

    let backend = match &config.database_path {
        Some(path) => Some(Arc::new(SqliteBackend::open(Path::new(path))?)),
        None => None,
    };

    let state = AppState {
        store: store.clone() as Arc<dyn Storage>,
        backend,
        sign_key: config.sign_key.clone().map(Arc::new),
        snapshot_path: Arc::new(snapshot_path.clone()),
        dump_on_update: config.store_interval_secs == 0,
    };

    // Periodic snapshot dump; sync mode dumps from the handlers instead.
    let dump_handle = if config.store_interval_secs > 0 {
        let store = state.store.clone();
        let path = snapshot_path.clone();
        let period = Duration::from_secs(config.store_interval_secs);
        Some(tokio::spawn(async move {
            let mut tick = interval(period);
            tick.tick().await; // the immediate first tick
            loop {
                tick.tick().await;
                match snapshot::save_to_file(store.as_ref(), &path) {
                    Ok(()) => tracing::debug!("snapshot written"),
                    Err(e) => tracing::error!(error = %e, "periodic snapshot failed"),
                }
            }
        }))
    } else {
        None
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server started");

    let server = axum::serve(listener, app::build_app(state.clone()));
    server
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("shutting down gracefully");
        })
        .await?;

    if let Some(handle) = dump_handle {
        handle.abort();
    }
    match snapshot::save_to_file(store.as_ref(), &snapshot_path) {
        Ok(()) => tracing::info!(path = %config.snapshot_path, "final snapshot written"),
        Err(e) => tracing::error!(error = %e, "final snapshot failed"),
    }
    tracing::info!("server stopped");

    Ok(())
}
