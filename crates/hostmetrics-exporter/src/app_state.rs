//! Shared application state for the exporter.
//!
//! The registry is built once here and handed out by `Arc` to the collector
//! (writer) and the HTTP handlers (readers). Startup errors are returned,
//! not panicked, so `main` can exit with a non-zero code.

use std::sync::Arc;

use hostmetrics_core::error::Result;
use hostmetrics_core::Registry;

use crate::collector::HostGauges;
use crate::config::ExporterConfig;
use crate::obs::ProcessMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    registry: Arc<Registry>,
    gauges: HostGauges,
}

impl AppState {
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        // 1) Registry with the default label
        let label = cfg.exporter.app_label.as_str();
        let registry = if label.is_empty() {
            Registry::new()
        } else {
            Registry::with_default_labels([("app", label)])?
        };

        // 2) Host gauges
        let gauges = HostGauges::register(&registry)?;

        // 3) Runtime metrics
        if cfg.exporter.process_metrics {
            registry.register_source(Arc::new(ProcessMetrics::new()?))?;
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry: Arc::new(registry),
                gauges,
            }),
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn gauges(&self) -> &HostGauges {
        &self.inner.gauges
    }
}
