use metra_common::Metric;
use std::collections::{BTreeMap, HashMap};

/// Counter metric carrying the number of polls since the previous
/// emitted batch. The server accumulates the deltas, so its stored
/// total equals the agent's lifetime poll count.
pub const POLL_COUNT: &str = "PollCount";

/// Merges sampler snapshots into the agent's current view.
///
/// Gauges are last-write-wins by name and survive across reports; the
/// poll counter increments once per absorbed snapshot and resets each
/// time a batch is taken (delta semantics).
#[derive(Default)]
pub struct Aggregator {
    gauges: BTreeMap<String, f64>,
    poll_count: i64,
    dirty: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one full sampler snapshot.
    pub fn absorb(&mut self, sample: HashMap<String, f64>) {
        for (name, value) in sample {
            self.gauges.insert(name, value);
        }
        self.poll_count += 1;
        self.dirty = true;
    }

    /// Emits one batch holding every known gauge plus the `PollCount`
    /// delta, or `None` when nothing was absorbed since the last take —
    /// the report tick is skipped rather than sent empty.
    pub fn take_batch(&mut self) -> Option<Vec<Metric>> {
        if !self.dirty {
            return None;
        }

        let mut batch: Vec<Metric> = self
            .gauges
            .iter()
            .map(|(name, value)| Metric::gauge(name.clone(), *value))
            .collect();
        batch.push(Metric::counter(POLL_COUNT, self.poll_count));

        self.poll_count = 0;
        self.dirty = false;
        Some(batch)
    }
}
