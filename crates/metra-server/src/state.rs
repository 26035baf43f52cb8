use metra_storage::{snapshot, SqliteBackend, Storage};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Authoritative aggregate state; every handler goes through this
    /// capability interface.
    pub store: Arc<dyn Storage>,
    /// Optional durable write-through backend; advisory only.
    pub backend: Option<Arc<SqliteBackend>>,
    /// Shared secret for request signature verification.
    pub sign_key: Option<Arc<String>>,
    pub snapshot_path: Arc<PathBuf>,
    /// Synchronous dump mode (`store_interval_secs == 0`): the snapshot
    /// file is rewritten after every accepted update.
    pub dump_on_update: bool,
}

impl AppState {
    /// Mirrors a gauge update to the durable backend, best-effort.
    pub fn write_through_gauge(&self, name: &str, value: f64) {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.write_gauge(name, value) {
                tracing::error!(metric = %name, error = %e, "gauge write-through failed");
            }
        }
    }

    /// Mirrors a counter delta to the durable backend, best-effort.
    pub fn write_through_counter(&self, name: &str, delta: i64) {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.write_counter(name, delta) {
                tracing::error!(metric = %name, error = %e, "counter write-through failed");
            }
        }
    }

    /// In synchronous dump mode, rewrites the snapshot file; a failed
    /// dump is logged and the request still succeeds.
    pub fn dump_if_sync(&self) {
        if !self.dump_on_update {
            return;
        }
        if let Err(e) = snapshot::save_to_file(self.store.as_ref(), &self.snapshot_path) {
            tracing::error!(error = %e, "synchronous snapshot dump failed");
        }
    }
}
