use crate::error::{Result, StorageError};
use crate::Storage;
use metra_common::Snapshot;
use std::path::Path;

/// Serializes the store's current snapshot to `path` as JSON.
///
/// Works against any [`Storage`] implementation; the caller decides
/// whether a failure is fatal (startup) or logged (periodic dump).
pub fn save_to_file(store: &dyn Storage, path: &Path) -> Result<()> {
    let data = serde_json::to_vec(&store.snapshot())?;
    std::fs::write(path, data).map_err(|source| StorageError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Replaces the store's state with the snapshot stored at `path`.
pub fn load_from_file(store: &dyn Storage, path: &Path) -> Result<()> {
    let data = std::fs::read(path).map_err(|source| StorageError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let snapshot: Snapshot = serde_json::from_slice(&data)?;
    store.restore(snapshot);
    Ok(())
}
