use serde::Serialize;
use std::collections::BTreeMap;

/// Label set of a sample, sorted by label name.
pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Static description of a metric family: name, help text and kind.
///
/// Collectors declare their families as constants so the gauge/counter
/// classification of every upstream field is fixed at compile time.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct MetricFamily {
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
}

impl MetricFamily {
    pub const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
        }
    }

    pub const fn counter(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Start a sample of this family without labels.
    pub fn sample(&self, value: f64) -> MetricSample {
        MetricSample {
            family: *self,
            labels: Labels::new(),
            value,
        }
    }
}

/// A single observation of one metric family with a fixed label set.
///
/// Samples are assembled with [`MetricSample::label`] by the collector that
/// produces them and are never modified once handed to a sink.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricSample {
    family: MetricFamily,
    labels: Labels,
    value: f64,
}

impl MetricSample {
    pub fn label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn family(&self) -> &MetricFamily {
        &self.family
    }

    pub fn name(&self) -> &'static str {
        self.family.name
    }

    pub fn help(&self) -> &'static str {
        self.family.help
    }

    pub fn kind(&self) -> MetricKind {
        self.family.kind
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn label_value(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}
