//! CPU time accounting.
//!
//! Counters are OS ticks (or any consistent unit) accumulated since boot. A
//! host reports one [`CpuTimes`] per logical core; the sampler sums them and
//! derives a busy percentage either since boot or between two snapshots.

use std::iter::Sum;
use std::ops::Add;

/// Time spent per category for one core, or summed across cores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    /// Hardware interrupt time (`irq`); softirq is not accounted.
    pub interrupt: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.interrupt)
    }

    /// Non-idle time.
    pub fn busy(&self) -> u64 {
        self.total().saturating_sub(self.idle)
    }

    /// `(total - idle) / total * 100`, or `0.0` when nothing was accounted.
    pub fn usage_percent(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let pct = self.busy() as f64 / total as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }

    /// Per-category difference against an earlier snapshot.
    ///
    /// Counters that went backwards (core offlined, counter wrap) contribute 0.
    pub fn since(&self, earlier: &CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_sub(earlier.user),
            nice: self.nice.saturating_sub(earlier.nice),
            system: self.system.saturating_sub(earlier.system),
            idle: self.idle.saturating_sub(earlier.idle),
            interrupt: self.interrupt.saturating_sub(earlier.interrupt),
        }
    }
}

impl Add for CpuTimes {
    type Output = CpuTimes;

    fn add(self, rhs: CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_add(rhs.user),
            nice: self.nice.saturating_add(rhs.nice),
            system: self.system.saturating_add(rhs.system),
            idle: self.idle.saturating_add(rhs.idle),
            interrupt: self.interrupt.saturating_add(rhs.interrupt),
        }
    }
}

impl Sum for CpuTimes {
    fn sum<I: Iterator<Item = CpuTimes>>(iter: I) -> CpuTimes {
        iter.fold(CpuTimes::default(), Add::add)
    }
}

impl<'a> Sum<&'a CpuTimes> for CpuTimes {
    fn sum<I: Iterator<Item = &'a CpuTimes>>(iter: I) -> CpuTimes {
        iter.copied().sum()
    }
}
