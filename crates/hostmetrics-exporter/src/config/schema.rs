use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use hostmetrics_core::error::{ExporterError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ExporterSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ExporterError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.exporter.validate()?;

        Ok(())
    }

    /// Apply `PORT`, `SCRAPE_INTERVAL_MS` and `APP_LABEL` on top of the file
    /// values. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ExporterError::Config(format!("PORT must be a port number, got {port:?}")))?;
            let mut addr = self.listen_addr()?;
            addr.set_port(port);
            self.exporter.listen = addr.to_string();
        }
        if let Some(ms) = lookup("SCRAPE_INTERVAL_MS") {
            self.exporter.scrape_interval_ms = ms.trim().parse().map_err(|_| {
                ExporterError::Config(format!("SCRAPE_INTERVAL_MS must be an integer, got {ms:?}"))
            })?;
        }
        if let Some(label) = lookup("APP_LABEL") {
            self.exporter.app_label = label;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.exporter.listen.parse().map_err(|_| {
            ExporterError::Config(format!(
                "exporter.listen must be a valid socket address, got {:?}",
                self.exporter.listen
            ))
        })
    }

    pub fn scrape_interval(&self) -> Duration {
        Duration::from_millis(self.exporter.scrape_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.exporter.request_timeout_ms)
    }
}

/// How the CPU gauge turns cumulative counters into a percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuMode {
    /// Busy share between this tick and the previous one.
    #[default]
    Delta,
    /// Busy share since boot, recomputed on every tick.
    Cumulative,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_scrape_interval_ms")]
    pub scrape_interval_ms: u64,

    /// Value of the `app` label added to every metric. Empty disables it.
    #[serde(default = "default_app_label")]
    pub app_label: String,

    #[serde(default)]
    pub cpu_mode: CpuMode,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_process_metrics")]
    pub process_metrics: bool,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            scrape_interval_ms: default_scrape_interval_ms(),
            app_label: default_app_label(),
            cpu_mode: CpuMode::default(),
            request_timeout_ms: default_request_timeout_ms(),
            process_metrics: default_process_metrics(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<SocketAddr>().is_err() {
            return Err(ExporterError::Config(format!(
                "exporter.listen must be a valid socket address, got {:?}",
                self.listen
            )));
        }
        if !(1..=3_600_000).contains(&self.scrape_interval_ms) {
            return Err(ExporterError::Config(
                "exporter.scrape_interval_ms must be between 1 and 3600000".into(),
            ));
        }
        if !(100..=60_000).contains(&self.request_timeout_ms) {
            return Err(ExporterError::Config(
                "exporter.request_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.app_label.contains('\n') {
            return Err(ExporterError::Config("exporter.app_label must be a single line".into()));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}
fn default_scrape_interval_ms() -> u64 {
    10_000
}
fn default_app_label() -> String {
    "my-system-info-exporter".into()
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_process_metrics() -> bool {
    true
}
