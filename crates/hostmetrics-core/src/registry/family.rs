//! Metric families produced on demand by pluggable sources.

use crate::error::Result;

/// Exposition `# TYPE` of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// One label combination and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    /// Sample without labels of its own.
    pub fn bare(value: f64) -> Self {
        Self { labels: Vec::new(), value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    /// Single-sample gauge family, the common case for process metrics.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Gauge,
            samples: vec![Sample::bare(value)],
        }
    }

    pub fn counter(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Counter,
            samples: vec![Sample::bare(value)],
        }
    }
}

/// Anything that can produce metric families when the registry is rendered.
///
/// Sources are hosted next to the registry's own gauges (runtime/process
/// metrics, build info, ...). `collect` runs on every scrape and should only
/// read: two scrapes with no `refresh` in between must see the same figures.
/// Sources that query the OS do it in `refresh`, which the collector calls
/// once per tick.
pub trait MetricSource: Send + Sync {
    /// Unique source name, used for registration and logging.
    fn name(&self) -> &str;

    fn collect(&self) -> Result<Vec<MetricFamily>>;

    /// Take a fresh snapshot. Sources without state keep the default no-op.
    fn refresh(&self) -> Result<()> {
        Ok(())
    }
}
