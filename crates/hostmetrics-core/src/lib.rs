//! hostmetrics core: metric store, text exposition encoder, and CPU-time
//! arithmetic shared by the exporter.
//!
//! This crate carries no transport or OS dependencies. The exporter feeds it
//! samples and asks it to render; everything here is deterministic and can be
//! exercised from plain unit tests.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! All fallible paths surface as `ExporterError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cpu;
pub mod error;
pub mod registry;

/// Shared result type.
pub use error::{ExporterError, Result};
pub use registry::{GaugeHandle, MetricFamily, MetricKind, MetricSource, Registry, Sample};
