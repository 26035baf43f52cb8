//! Aggregate store for the collector server.
//!
//! [`MemStorage`] holds the authoritative gauge/counter state behind a
//! single map-wide lock; [`snapshot`] dumps any [`Storage`] to (and
//! restores it from) a JSON snapshot file. [`SqliteBackend`] is an
//! optional write-through audit backend; its failures never affect the
//! in-memory state.

pub mod backend;
pub mod error;
pub mod memory;
pub mod snapshot;


pub use backend::SqliteBackend;
pub use error::{Result, StorageError};
pub use memory::MemStorage;

use metra_common::Snapshot;

/// Capability surface of an aggregate store.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because the store is hit concurrently by every request handler.
/// Updates to the same key are atomic (no lost counter deltas, gauges
/// settle on the last completed write) and are applied in arrival order.
pub trait Storage: Send + Sync {
    /// Current gauge value, if the gauge has ever been observed.
    fn get_gauge(&self, name: &str) -> Option<f64>;

    /// Current accumulated counter total, if the counter has ever been
    /// observed.
    fn get_counter(&self, name: &str) -> Option<i64>;

    /// Replaces the stored gauge value (last write wins).
    fn update_gauge(&self, name: &str, value: f64);

    /// Adds `delta` to the stored counter, creating it on first
    /// observation. Counters are never deleted for the store's lifetime.
    fn update_counter(&self, name: &str, delta: i64);

    /// Point-in-time consistent dump of all gauges and counters.
    fn snapshot(&self) -> Snapshot;

    /// Replaces the entire state; used once at startup before serving.
    fn restore(&self, snapshot: Snapshot);
}
