//! Gauge sampling for the metra agent.
//!
//! Each [`Collector`] implementation produces a fresh full snapshot of
//! gauge values per poll tick (never a diff). Two sources run side by
//! side on the agent: the process-runtime view and the OS-level view.

pub mod runtime;
pub mod system;

pub use runtime::RuntimeCollector;
pub use system::SystemCollector;

use anyhow::Result;
use std::collections::HashMap;

/// A gauge sampler running on the agent host.
///
/// Implementations are registered in the agent's sampling loop and
/// called at each poll interval. The trait requires `Send` so samplers
/// can run on independent tasks without blocking one another.
pub trait Collector: Send {
    /// Returns the collector name (e.g., `"runtime"`), used for logging.
    fn name(&self) -> &str;

    /// Samples current gauge values, keyed by metric name.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system API call fails.
    fn collect(&mut self) -> Result<HashMap<String, f64>>;
}
