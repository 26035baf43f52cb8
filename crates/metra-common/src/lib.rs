//! Shared wire model and transport codec for the metra pipeline.
//!
//! Both sides of the pipeline depend on this crate: the agent serializes
//! [`Metric`] batches, optionally signs and gzip-frames them, and the
//! server reverses each step before touching its store. [`retry`] holds
//! the retry policy shared by the delivery client and the storage
//! write-through path.

pub mod codec;
pub mod model;
pub mod retry;
pub mod sign;

pub use model::{Metric, MetricKind, Snapshot};
