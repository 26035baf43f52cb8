use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric kind carried on the wire in the `type` field.
///
/// # Examples
///
/// ```
/// use metra_common::MetricKind;
///
/// let kind: MetricKind = "counter".parse().unwrap();
/// assert_eq!(kind, MetricKind::Counter);
/// assert_eq!(kind.to_string(), "counter");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Counter => write!(f, "counter"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            _ => Err(format!("unknown metric kind: {s}")),
        }
    }
}

/// A metric whose payload fields violate the kind invariant.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMetric {
    #[error("gauge '{0}' is missing its value")]
    MissingValue(String),
    #[error("counter '{0}' is missing its delta")]
    MissingDelta(String),
    #[error("metric '{0}' carries both a value and a delta")]
    BothPayloads(String),
}

/// One metric observation on the wire.
///
/// Exactly one of `value`/`delta` is present, determined by `kind`:
/// gauges carry `value`, counters carry `delta`. The unused field is
/// omitted from the serialized form entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
}

impl Metric {
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Gauge,
            value: Some(value),
            delta: None,
        }
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Counter,
            value: None,
            delta: Some(delta),
        }
    }

    /// Checks the kind invariant: exactly one payload field, and the one
    /// matching `kind`. Decoded metrics must pass this before they reach
    /// a store.
    pub fn validate(&self) -> Result<(), InvalidMetric> {
        if self.value.is_some() && self.delta.is_some() {
            return Err(InvalidMetric::BothPayloads(self.id.clone()));
        }
        match self.kind {
            MetricKind::Gauge if self.value.is_none() => {
                Err(InvalidMetric::MissingValue(self.id.clone()))
            }
            MetricKind::Counter if self.delta.is_none() => {
                Err(InvalidMetric::MissingDelta(self.id.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Point-in-time dump of an aggregate store.
///
/// Serves as both the durable snapshot-file format and the bulk
/// dump/restore shape. `BTreeMap` keeps the serialized output
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub gauges: BTreeMap<String, f64>,
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
}
