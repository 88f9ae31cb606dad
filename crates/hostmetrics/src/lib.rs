//! Top-level facade crate for hostmetrics.
//!
//! Re-exports the metric store and the exporter library so users can depend on a single crate.

pub mod core {
    pub use hostmetrics_core::*;
}

pub mod exporter {
    pub use hostmetrics_exporter::*;
}
