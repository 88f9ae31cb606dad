//! Shared error type across hostmetrics crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// The OS metrics query failed or returned inconsistent data.
    #[error("os query failed: {0}")]
    OsQuery(String),
    /// Two metrics (or two sources) were registered under one name.
    #[error("duplicate metric name: {0}")]
    DuplicateName(String),
    /// Metric or label name does not match the exposition grammar.
    #[error("invalid metric name: {0}")]
    InvalidName(String),
    /// The HTTP listener could not acquire its address.
    #[error("bind failed: {0}")]
    Bind(String),
    /// The HTTP server stopped with an I/O error.
    #[error("server failed: {0}")]
    Server(String),
    /// Rendering the registry failed.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// Configuration could not be read, parsed, or validated.
    #[error("invalid config: {0}")]
    Config(String),
}

impl ExporterError {
    /// Stable code used in logs and error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ExporterError::OsQuery(_) => "OS_QUERY",
            ExporterError::DuplicateName(_) => "DUPLICATE_NAME",
            ExporterError::InvalidName(_) => "INVALID_NAME",
            ExporterError::Bind(_) => "BIND",
            ExporterError::Server(_) => "SERVER",
            ExporterError::Serialization(_) => "SERIALIZATION",
            ExporterError::Config(_) => "CONFIG",
        }
    }
}
