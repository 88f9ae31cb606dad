use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Gauge storage. The value is kept as `f64` bits in one atomic word, so a
/// reader never observes half of an old value and half of a new one.
#[derive(Debug)]
pub(crate) struct GaugeCore {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) labels: Vec<(String, String)>,
    bits: AtomicU64,
}

impl GaugeCore {
    pub(crate) fn new(name: String, help: String, labels: Vec<(String, String)>) -> Self {
        Self {
            name,
            help,
            labels,
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }
}

/// Cloneable handle to a registered gauge.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    pub(crate) core: Arc<GaugeCore>,
}

impl GaugeHandle {
    /// Overwrite the current value. No range validation.
    pub fn set(&self, v: f64) {
        self.core.bits.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.core.bits.load(Ordering::Relaxed))
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }
}
