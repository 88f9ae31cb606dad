//! Collector loop: the only writer of the host gauges.
//!
//! One tokio task ticks at the configured period, runs the sampler on the
//! blocking pool, and overwrites each gauge. A failed sample is logged and
//! the gauges keep their previous values until the next tick. Ticks never
//! overlap: a slow sample delays the next tick instead of queueing a burst.
//!
//! When armed with a registry, the same tick also refreshes its metric
//! sources, so scrapes between two ticks render identical bodies.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use hostmetrics_core::error::{ExporterError, Result};
use hostmetrics_core::{GaugeHandle, Registry};

use crate::sampler::{HostCounters, HostSample, Sampler};

pub const CPU_USAGE: &str = "system_cpu_usage";
pub const FREE_MEMORY: &str = "system_free_memory_bytes";
pub const TOTAL_MEMORY: &str = "system_total_memory_bytes";

/// Handles to the gauges the collector owns.
#[derive(Debug, Clone)]
pub struct HostGauges {
    pub cpu_usage: GaugeHandle,
    pub free_memory: GaugeHandle,
    pub total_memory: GaugeHandle,
}

impl HostGauges {
    pub fn register(registry: &Registry) -> Result<Self> {
        Ok(Self {
            cpu_usage: registry.register_gauge(CPU_USAGE, "CPU usage percentage")?,
            free_memory: registry.register_gauge(FREE_MEMORY, "Free memory in bytes")?,
            total_memory: registry.register_gauge(TOTAL_MEMORY, "Total memory in bytes")?,
        })
    }

    pub fn apply(&self, s: &HostSample) {
        self.cpu_usage.set(s.cpu_usage_percent);
        self.free_memory.set(s.free_bytes as f64);
        self.total_memory.set(s.total_bytes as f64);
    }
}

#[derive(Debug, Default)]
struct Stats {
    ticks: AtomicU64,
    failures: AtomicU64,
}

/// Running collector. Dropping the handle does not stop the task; call
/// [`CollectorHandle::shutdown`].
pub struct CollectorHandle {
    stats: Arc<Stats>,
    task: JoinHandle<()>,
}

impl CollectorHandle {
    /// Completed ticks, successful or not.
    pub fn ticks(&self) -> u64 {
        self.stats.ticks.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.stats.failures.load(Ordering::Relaxed)
    }

    /// Abandon the loop; an in-flight tick is lost.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Arm the loop. The first tick fires immediately.
pub fn spawn<C>(sampler: Sampler<C>, gauges: HostGauges, period: Duration) -> CollectorHandle
where
    C: HostCounters + 'static,
{
    arm(sampler, gauges, None, period)
}

/// Like [`spawn`], and also refresh `registry`'s sources on every tick.
pub fn spawn_with_sources<C>(
    sampler: Sampler<C>,
    gauges: HostGauges,
    registry: Arc<Registry>,
    period: Duration,
) -> CollectorHandle
where
    C: HostCounters + 'static,
{
    arm(sampler, gauges, Some(registry), period)
}

fn arm<C>(
    sampler: Sampler<C>,
    gauges: HostGauges,
    sources: Option<Arc<Registry>>,
    period: Duration,
) -> CollectorHandle
where
    C: HostCounters + 'static,
{
    let stats = Arc::new(Stats::default());
    let task = tokio::spawn(run(sampler, gauges, sources, period, Arc::clone(&stats)));
    CollectorHandle { stats, task }
}

/// One sample. A panic inside the counters is turned into an error and the
/// delta window restarts, since the stored snapshot may be half-updated.
fn sample_guarded<C: HostCounters>(sampler: &mut Sampler<C>) -> Result<HostSample> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| sampler.sample())) {
        Ok(res) => res,
        Err(_) => {
            sampler.reset();
            Err(ExporterError::OsQuery("sampler panicked".into()))
        }
    }
}

async fn run<C>(
    mut sampler: Sampler<C>,
    gauges: HostGauges,
    sources: Option<Arc<Registry>>,
    period: Duration,
    stats: Arc<Stats>,
) where
    C: HostCounters + 'static,
{
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        period_ms = period.as_millis() as u64,
        cpu_mode = ?sampler.mode(),
        "collector started"
    );

    loop {
        tick.tick().await;

        let registry = sources.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let res = sample_guarded(&mut sampler);
            if let Some(registry) = registry {
                if std::panic::catch_unwind(AssertUnwindSafe(|| registry.refresh_sources())).is_err() {
                    tracing::warn!("metric source refresh panicked");
                }
            }
            (sampler, res)
        })
        .await;

        // panics are caught above, so a join error means the runtime is
        // shutting down
        let res = match joined {
            Ok((s, res)) => {
                sampler = s;
                res
            }
            Err(e) => {
                tracing::error!(error = %e, "sampler task cancelled, collector stopping");
                return;
            }
        };

        match res {
            Ok(sample) => {
                gauges.apply(&sample);
                tracing::debug!(
                    cpu = sample.cpu_usage_percent,
                    free = sample.free_bytes,
                    total = sample.total_bytes,
                    "host sampled"
                );
            }
            Err(e) => {
                stats.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(code = e.code(), error = %e, "host sample failed, keeping previous values");
            }
        }
        stats.ticks.fetch_add(1, Ordering::Relaxed);
    }
}
