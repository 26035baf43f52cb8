use crate::Storage;
use metra_common::Snapshot;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    gauges: HashMap<String, f64>,
    counters: HashMap<String, i64>,
}

/// In-memory aggregate store.
///
/// One map-wide `RwLock` protects both maps: contention is low, and a
/// single lock gives `snapshot()` its point-in-time consistency for
/// free. Readers (including snapshots) share the read lock.
#[derive(Default)]
pub struct MemStorage {
    inner: RwLock<Inner>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemStorage {
    fn get_gauge(&self, name: &str) -> Option<f64> {
        self.inner.read().unwrap().gauges.get(name).copied()
    }

    fn get_counter(&self, name: &str) -> Option<i64> {
        self.inner.read().unwrap().counters.get(name).copied()
    }

    fn update_gauge(&self, name: &str, value: f64) {
        self.inner
            .write()
            .unwrap()
            .gauges
            .insert(name.to_string(), value);
    }

    fn update_counter(&self, name: &str, delta: i64) {
        let mut inner = self.inner.write().unwrap();
        *inner.counters.entry(name.to_string()).or_insert(0) += delta;
    }

    fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().unwrap();
        Snapshot {
            gauges: inner.gauges.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            counters: inner
                .counters
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }

    fn restore(&self, snapshot: Snapshot) {
        let mut inner = self.inner.write().unwrap();
        inner.gauges = snapshot.gauges.into_iter().collect();
        inner.counters = snapshot.counters.into_iter().collect();
    }
}
