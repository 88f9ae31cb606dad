//! Runtime metrics for the exporter process itself.
//!
//! Registered with the registry as a [`MetricSource`]. The OS is queried in
//! [`MetricSource::refresh`], which the collector runs once per tick; scrapes
//! only read the last snapshot, so concurrent scrapes see the same figures.
//!
//! On Linux the snapshot also carries CPU seconds from `/proc/self/stat` and
//! file descriptor usage from `/proc/self/{fd,limits}`.

use std::sync::{Mutex, PoisonError};

use sysinfo::{Pid, System};

use hostmetrics_core::error::{ExporterError, Result};
use hostmetrics_core::{MetricFamily, MetricSource};

pub struct ProcessMetrics {
    pid: Pid,
    sys: Mutex<System>,
    snapshot: Mutex<Vec<MetricFamily>>,
}

impl ProcessMetrics {
    /// Resolve the current pid and take the first snapshot.
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| ExporterError::OsQuery(format!("current pid unavailable: {e}")))?;
        let m = Self {
            pid,
            sys: Mutex::new(System::new()),
            snapshot: Mutex::new(Vec::new()),
        };
        m.refresh()?;
        Ok(m)
    }

    fn read_families(&self) -> Result<Vec<MetricFamily>> {
        // A panic while holding the lock leaves `System` usable; the next
        // refresh overwrites whatever it held.
        let mut sys = self.sys.lock().unwrap_or_else(PoisonError::into_inner);

        if !sys.refresh_process(self.pid) {
            return Err(ExporterError::OsQuery(format!("process {} not found", self.pid)));
        }
        let proc = sys
            .process(self.pid)
            .ok_or_else(|| ExporterError::OsQuery(format!("process {} not found", self.pid)))?;

        #[allow(unused_mut)]
        let mut families = vec![
            MetricFamily::gauge(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
                proc.start_time() as f64,
            ),
            MetricFamily::gauge(
                "process_uptime_seconds",
                "Time the process has been running in seconds.",
                proc.run_time() as f64,
            ),
            MetricFamily::gauge(
                "process_resident_memory_bytes",
                "Resident memory size in bytes.",
                proc.memory() as f64,
            ),
            MetricFamily::gauge(
                "process_virtual_memory_bytes",
                "Virtual memory size in bytes.",
                proc.virtual_memory() as f64,
            ),
        ];
        drop(sys);

        #[cfg(target_os = "linux")]
        families.extend(linux::families()?);

        Ok(families)
    }
}

impl MetricSource for ProcessMetrics {
    fn name(&self) -> &str {
        "process"
    }

    fn collect(&self) -> Result<Vec<MetricFamily>> {
        Ok(self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn refresh(&self) -> Result<()> {
        let families = self.read_families()?;
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = families;
        Ok(())
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use hostmetrics_core::error::{ExporterError, Result};
    use hostmetrics_core::MetricFamily;

    const SELF_STAT: &str = "/proc/self/stat";
    const SELF_FD: &str = "/proc/self/fd";
    const SELF_LIMITS: &str = "/proc/self/limits";

    fn read(path: &str) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| ExporterError::OsQuery(format!("{path}: {e}")))
    }

    fn clk_tck() -> f64 {
        // SAFETY: `sysconf` only reads a system constant.
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if hz > 0 {
            hz as f64
        } else {
            100.0
        }
    }

    /// `(utime, stime)` in clock ticks.
    ///
    /// `comm` may contain spaces and parentheses, so fields are counted from
    /// the last `)`: state is the first, utime the 12th, stime the 13th.
    pub(super) fn parse_cpu_ticks(stat: &str) -> Option<(u64, u64)> {
        let rest = &stat[stat.rfind(')')? + 1..];
        let mut fields = rest.split_whitespace().skip(11);
        let utime = fields.next()?.parse().ok()?;
        let stime = fields.next()?.parse().ok()?;
        Some((utime, stime))
    }

    /// Soft limit of the `Max open files` row; `unlimited` maps to `+Inf`.
    pub(super) fn parse_max_fds(limits: &str) -> Option<f64> {
        let row = limits.lines().find(|l| l.starts_with("Max open files"))?;
        let soft = row["Max open files".len()..].split_whitespace().next()?;
        if soft == "unlimited" {
            return Some(f64::INFINITY);
        }
        soft.parse::<u64>().ok().map(|v| v as f64)
    }

    pub(super) fn families() -> Result<Vec<MetricFamily>> {
        let stat = read(SELF_STAT)?;
        let (utime, stime) = parse_cpu_ticks(&stat)
            .ok_or_else(|| ExporterError::OsQuery(format!("{SELF_STAT}: unexpected format")))?;
        let hz = clk_tck();
        let user = utime as f64 / hz;
        let system = stime as f64 / hz;

        let open = std::fs::read_dir(SELF_FD)
            .map_err(|e| ExporterError::OsQuery(format!("{SELF_FD}: {e}")))?
            .count();
        let max = parse_max_fds(&read(SELF_LIMITS)?)
            .ok_or_else(|| ExporterError::OsQuery(format!("{SELF_LIMITS}: no open files limit")))?;

        Ok(vec![
            MetricFamily::counter(
                "process_cpu_user_seconds_total",
                "Total user CPU time spent in seconds.",
                user,
            ),
            MetricFamily::counter(
                "process_cpu_system_seconds_total",
                "Total system CPU time spent in seconds.",
                system,
            ),
            MetricFamily::counter(
                "process_cpu_seconds_total",
                "Total user and system CPU time spent in seconds.",
                user + system,
            ),
            MetricFamily::gauge(
                "process_open_fds",
                "Number of open file descriptors.",
                open as f64,
            ),
            MetricFamily::gauge(
                "process_max_fds",
                "Maximum number of open file descriptors.",
                max,
            ),
        ])
    }
}
