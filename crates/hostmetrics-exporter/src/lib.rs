//! hostmetrics exporter library entry.
//!
//! Wires the host sampler, the collector loop, and the `/metrics` HTTP
//! surface around a `hostmetrics_core::Registry`. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod collector;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod sampler;
pub mod server;
