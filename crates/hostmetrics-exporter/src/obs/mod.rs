//! Metric sources hosted next to the host gauges.

pub mod process;

pub use process::ProcessMetrics;
