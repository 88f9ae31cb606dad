//! Metric store.
//!
//! The registry owns a set of named gauges and hosts pluggable
//! [`MetricSource`]s. Gauges are written by a single collector and read by
//! any number of concurrent renders; each value lives in one atomic word so
//! no lock is needed on either path. Name bookkeeping goes through `DashMap`
//! entries so a duplicate registration fails without touching the map.

mod family;
mod gauge;
pub mod text;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{ExporterError, Result};

pub use family::{MetricFamily, MetricKind, MetricSource, Sample};
pub use gauge::GaugeHandle;
use gauge::GaugeCore;
pub use text::CONTENT_TYPE;

struct SourceEntry {
    seq: u64,
    source: Arc<dyn MetricSource>,
}

#[derive(Default)]
pub struct Registry {
    default_labels: Vec<(String, String)>,
    gauges: DashMap<String, GaugeHandle>,
    sources: DashMap<String, SourceEntry>,
    seq: AtomicU64,
}

impl Registry {
    /// Empty registry with no default labels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry whose renders append `labels` to every sample.
    pub fn with_default_labels<K, V, I>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut default_labels = Vec::new();
        for (k, v) in labels {
            let k = k.into();
            text::validate_label_name(&k)?;
            if default_labels.iter().any(|(existing, _): &(String, String)| *existing == k) {
                return Err(ExporterError::DuplicateName(format!("default label {k}")));
            }
            default_labels.push((k, v.into()));
        }
        Ok(Self { default_labels, ..Self::default() })
    }

    pub fn default_labels(&self) -> &[(String, String)] {
        &self.default_labels
    }

    /// Register a gauge with no labels of its own.
    pub fn register_gauge(&self, name: &str, help: &str) -> Result<GaugeHandle> {
        self.register_gauge_with_labels(name, help, &[])
    }

    /// Register a gauge carrying a fixed label set. The value starts at `0`.
    ///
    /// Fails with `DuplicateName` if `name` is taken; the registry is left
    /// unchanged in that case.
    pub fn register_gauge_with_labels(
        &self,
        name: &str,
        help: &str,
        labels: &[(&str, &str)],
    ) -> Result<GaugeHandle> {
        text::validate_metric_name(name)?;
        for (k, _) in labels {
            text::validate_label_name(k)?;
        }

        match self.gauges.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ExporterError::DuplicateName(name.to_string())),
            Entry::Vacant(slot) => {
                let labels = labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                let handle = GaugeHandle {
                    core: Arc::new(GaugeCore::new(name.to_string(), help.to_string(), labels)),
                };
                slot.insert(handle.clone());
                tracing::debug!(gauge = %name, "gauge registered");
                Ok(handle)
            }
        }
    }

    /// Host a metric source. Sources render after the gauges, in
    /// registration order.
    pub fn register_source(&self, source: Arc<dyn MetricSource>) -> Result<()> {
        let name = source.name().to_string();
        match self.sources.entry(name.clone()) {
            Entry::Occupied(_) => Err(ExporterError::DuplicateName(format!("source {name}"))),
            Entry::Vacant(slot) => {
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(SourceEntry { seq, source });
                tracing::debug!(source = %name, "metric source registered");
                Ok(())
            }
        }
    }

    /// Ask every source for a fresh snapshot, in registration order.
    ///
    /// A failing source keeps its previous snapshot; the failure is logged and
    /// counted, and the remaining sources still refresh.
    pub fn refresh_sources(&self) -> usize {
        let mut failed = 0;
        for (_, source) in self.sources_in_order() {
            if let Err(e) = source.refresh() {
                failed += 1;
                tracing::warn!(source = %source.name(), code = e.code(), error = %e, "metric source refresh failed");
            }
        }
        failed
    }

    fn sources_in_order(&self) -> Vec<(u64, Arc<dyn MetricSource>)> {
        let mut sources: Vec<(u64, Arc<dyn MetricSource>)> = self
            .sources
            .iter()
            .map(|e| (e.value().seq, Arc::clone(&e.value().source)))
            .collect();
        sources.sort_by_key(|(seq, _)| *seq);
        sources
    }

    pub fn gauge(&self, name: &str) -> Option<GaugeHandle> {
        self.gauges.get(name).map(|g| g.value().clone())
    }

    pub fn gauge_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gauges.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Render every gauge and every source family in text exposition format.
    ///
    /// Gauges come first, sorted by name. A failing source, or a family
    /// whose name collides with something already rendered, fails the whole
    /// render: callers never see a partial body. Rendering never writes to a
    /// gauge.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut gauges: Vec<GaugeHandle> = self.gauges.iter().map(|e| e.value().clone()).collect();
        gauges.sort_by(|a, b| a.core.name.cmp(&b.core.name));

        for g in &gauges {
            seen.insert(g.core.name.clone());
            text::write_family(
                &mut out,
                &g.core.name,
                &g.core.help,
                MetricKind::Gauge,
                [(g.core.labels.as_slice(), g.get())],
                &self.default_labels,
            );
        }

        for (_, source) in self.sources_in_order() {
            let families = source.collect().map_err(|e| {
                ExporterError::Serialization(format!("source {} failed: {e}", source.name()))
            })?;

            for fam in families {
                text::validate_metric_name(&fam.name)
                    .map_err(|e| ExporterError::Serialization(e.to_string()))?;
                if !seen.insert(fam.name.clone()) {
                    return Err(ExporterError::Serialization(format!(
                        "metric family {} rendered twice (source {})",
                        fam.name,
                        source.name()
                    )));
                }
                for sample in &fam.samples {
                    for (k, _) in &sample.labels {
                        text::validate_label_name(k)
                            .map_err(|e| ExporterError::Serialization(e.to_string()))?;
                    }
                }

                text::write_family(
                    &mut out,
                    &fam.name,
                    &fam.help,
                    fam.kind,
                    fam.samples.iter().map(|s| (s.labels.as_slice(), s.value)),
                    &self.default_labels,
                );
            }
        }

        Ok(out)
    }
}
