//! Prometheus text exposition format (0.0.4) encoder.

use std::fmt::Write;

use crate::error::{ExporterError, Result};
use crate::registry::family::MetricKind;

/// Media type served with a rendered registry.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub(crate) fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ExporterError::InvalidName(name.to_string()))
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub(crate) fn validate_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ExporterError::InvalidName(format!("label {name}")))
    }
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Integers render without a fractional part; non-finite values use the
/// exposition spellings.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{v}")
    }
}

/// Render one family: HELP, TYPE, then a sample line per label combination.
/// Default labels are appended unless the sample already carries that key.
pub(crate) fn write_family<'a, I>(
    out: &mut String,
    name: &str,
    help: &str,
    kind: MetricKind,
    samples: I,
    default_labels: &[(String, String)],
) where
    I: IntoIterator<Item = (&'a [(String, String)], f64)>,
{
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
    let _ = writeln!(out, "# TYPE {} {}", name, kind.as_str());

    for (labels, value) in samples {
        let defaults = default_labels
            .iter()
            .filter(|(k, _)| !labels.iter().any(|(lk, _)| lk == k));
        let label_str = labels
            .iter()
            .chain(defaults)
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",");

        if label_str.is_empty() {
            let _ = writeln!(out, "{} {}", name, format_value(value));
        } else {
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str, format_value(value));
        }
    }
}
