//! Exporter config loader (strict parsing, env overrides).

pub mod schema;

use std::fs;
use std::path::Path;

use hostmetrics_core::error::{ExporterError, Result};

pub use schema::{CpuMode, ExporterConfig, ExporterSection};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_PATH: &str = "hostmetrics.yaml";

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ExporterConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        ExporterError::Config(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| ExporterError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the effective config: explicit file, else `hostmetrics.yaml` if
/// present, else defaults; then environment overrides, then validation.
pub fn load(path: Option<&str>) -> Result<ExporterConfig> {
    load_with(path, Path::new(DEFAULT_PATH), |k| std::env::var(k).ok())
}

/// [`load`] with the fallback file and the environment supplied by the caller.
pub fn load_with<F>(path: Option<&str>, default_path: &Path, lookup: F) -> Result<ExporterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match path {
        Some(p) => load_from_file(p)?,
        None if default_path.exists() => load_from_file(default_path)?,
        None => ExporterConfig::default(),
    };
    cfg.apply_env(lookup)?;
    cfg.validate()?;
    Ok(cfg)
}
