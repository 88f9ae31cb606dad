//! Host sampler: one OS query per call.
//!
//! - `HostCounters`: where raw counters come from (OS, or scripted in tests)
//! - `SystemCounters`: `/proc/stat` per-core times (Linux) or the `sysinfo`
//!   global CPU usage (elsewhere), plus `sysinfo` memory
//! - `Sampler`: sums cores, derives the CPU percentage, checks memory figures

#[cfg(target_os = "linux")]
pub mod procstat;

#[cfg(target_os = "linux")]
use std::path::PathBuf;

use sysinfo::System;

use hostmetrics_core::cpu::CpuTimes;
use hostmetrics_core::error::{ExporterError, Result};

use crate::config::CpuMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub free_bytes: u64,
    pub total_bytes: u64,
}

/// Result of one sampling call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSample {
    /// In `[0, 100]`; `0.0` when no CPU time was accounted.
    pub cpu_usage_percent: f64,
    pub free_bytes: u64,
    pub total_bytes: u64,
}

/// What a host can tell about its CPU.
#[derive(Debug, Clone, PartialEq)]
pub enum CpuReading {
    /// Cumulative time counters, one entry per logical core.
    Times(Vec<CpuTimes>),
    /// Busy share already computed by the OS layer, in percent.
    Percent(f64),
}

/// Source of raw host counters.
pub trait HostCounters: Send {
    fn cpu(&mut self) -> Result<CpuReading>;

    fn memory(&mut self) -> Result<MemoryInfo>;
}

/// Counters read from the running host.
pub struct SystemCounters {
    sys: System,
    #[cfg(target_os = "linux")]
    stat_path: PathBuf,
}

#[cfg(target_os = "linux")]
impl SystemCounters {
    pub fn new() -> Self {
        Self::with_stat_path(procstat::PROC_STAT)
    }

    pub fn with_stat_path(path: impl Into<PathBuf>) -> Self {
        Self {
            sys: System::new(),
            stat_path: path.into(),
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl SystemCounters {
    pub fn new() -> Self {
        let mut sys = System::new();
        // sysinfo needs a baseline before the first usage figure means anything
        sys.refresh_cpu();
        Self { sys }
    }
}

impl Default for SystemCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCounters for SystemCounters {
    #[cfg(target_os = "linux")]
    fn cpu(&mut self) -> Result<CpuReading> {
        let raw = std::fs::read_to_string(&self.stat_path).map_err(|e| {
            ExporterError::OsQuery(format!("read {} failed: {e}", self.stat_path.display()))
        })?;
        procstat::parse_per_core(&raw).map(CpuReading::Times)
    }

    #[cfg(not(target_os = "linux"))]
    fn cpu(&mut self) -> Result<CpuReading> {
        self.sys.refresh_cpu();
        Ok(CpuReading::Percent(f64::from(self.sys.global_cpu_info().cpu_usage())))
    }

    fn memory(&mut self) -> Result<MemoryInfo> {
        self.sys.refresh_memory();
        Ok(MemoryInfo {
            free_bytes: self.sys.available_memory(),
            total_bytes: self.sys.total_memory(),
        })
    }
}

pub struct Sampler<C> {
    counters: C,
    mode: CpuMode,
    previous: Option<CpuTimes>,
}

impl<C: HostCounters> Sampler<C> {
    pub fn new(counters: C, mode: CpuMode) -> Self {
        Self {
            counters,
            mode,
            previous: None,
        }
    }

    pub fn mode(&self) -> CpuMode {
        self.mode
    }

    /// Forget the stored snapshot; the next `Delta` sample reports since boot.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Take one sample.
    ///
    /// In `Delta` mode the first call has no earlier snapshot and reports the
    /// since-boot figure. The stored snapshot only advances on success.
    /// Hosts reporting a ready percentage bypass the window; `mode` does not
    /// apply to them.
    pub fn sample(&mut self) -> Result<HostSample> {
        let (cpu_usage_percent, summed) = match self.counters.cpu()? {
            CpuReading::Times(cores) => {
                let summed: CpuTimes = cores.iter().sum();
                let window = match (self.mode, &self.previous) {
                    (CpuMode::Delta, Some(prev)) => summed.since(prev),
                    _ => summed,
                };
                (window.usage_percent(), Some(summed))
            }
            CpuReading::Percent(pct) if pct.is_finite() => (pct.clamp(0.0, 100.0), None),
            CpuReading::Percent(_) => (0.0, None),
        };

        let mem = self.counters.memory()?;
        if mem.total_bytes == 0 || mem.free_bytes > mem.total_bytes {
            return Err(ExporterError::OsQuery(format!(
                "inconsistent memory figures: free={} total={}",
                mem.free_bytes, mem.total_bytes
            )));
        }

        if summed.is_some() {
            self.previous = summed;
        }

        Ok(HostSample {
            cpu_usage_percent,
            free_bytes: mem.free_bytes,
            total_bytes: mem.total_bytes,
        })
    }
}
