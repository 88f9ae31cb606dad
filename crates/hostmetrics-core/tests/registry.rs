//! Metric store behaviour through the public API.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use hostmetrics_core::{ExporterError, MetricFamily, MetricKind, MetricSource, Registry, Sample};

struct FixedSource {
    name: &'static str,
    families: Vec<MetricFamily>,
}

impl MetricSource for FixedSource {
    fn name(&self) -> &str {
        self.name
    }

    fn collect(&self) -> hostmetrics_core::Result<Vec<MetricFamily>> {
        Ok(self.families.clone())
    }
}

struct BrokenSource;

impl MetricSource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    fn collect(&self) -> hostmetrics_core::Result<Vec<MetricFamily>> {
        Err(ExporterError::OsQuery("no process table".into()))
    }
}

#[test]
fn free_memory_line_round_trips_integer() {
    let reg = Registry::new();
    let g = reg
        .register_gauge("system_free_memory_bytes", "Free memory in bytes")
        .unwrap();
    g.set(1048576.0);

    let body = reg.render().unwrap();
    assert!(body.lines().any(|l| l == "system_free_memory_bytes 1048576"), "{body}");
}

#[test]
fn help_type_value_stay_together() {
    let reg = Registry::new();
    reg.register_gauge("b_metric", "second").unwrap().set(2.0);
    reg.register_gauge("a_metric", "first").unwrap().set(1.0);

    let body = reg.render().unwrap();
    assert_eq!(
        body,
        "# HELP a_metric first\n# TYPE a_metric gauge\na_metric 1\n\
         # HELP b_metric second\n# TYPE b_metric gauge\nb_metric 2\n"
    );
}

#[test]
fn default_labels_are_appended() {
    let reg = Registry::with_default_labels([("app", "my-system-info-exporter")]).unwrap();
    reg.register_gauge("system_cpu_usage", "CPU usage percentage")
        .unwrap()
        .set(12.5);
    reg.register_gauge_with_labels("per_core", "x", &[("core", "0")])
        .unwrap()
        .set(3.0);

    let body = reg.render().unwrap();
    assert!(body.contains("system_cpu_usage{app=\"my-system-info-exporter\"} 12.5\n"), "{body}");
    assert!(body.contains("per_core{core=\"0\",app=\"my-system-info-exporter\"} 3\n"), "{body}");
}

#[test]
fn duplicate_registration_leaves_registry_unchanged() {
    let reg = Registry::new();
    let first = reg.register_gauge("system_cpu_usage", "CPU usage percentage").unwrap();
    first.set(42.0);
    let before = reg.render().unwrap();

    let err = reg
        .register_gauge("system_cpu_usage", "another help")
        .expect_err("duplicate must fail");
    assert!(matches!(err, ExporterError::DuplicateName(ref n) if n == "system_cpu_usage"));
    assert_eq!(err.code(), "DUPLICATE_NAME");

    assert_eq!(reg.gauge_names(), vec!["system_cpu_usage".to_string()]);
    assert_eq!(reg.render().unwrap(), before);
    assert_eq!(reg.gauge("system_cpu_usage").unwrap().get(), 42.0);
}

#[test]
fn sources_render_after_gauges_in_registration_order() {
    let reg = Registry::with_default_labels([("app", "x")]).unwrap();
    reg.register_gauge("zz_gauge", "g").unwrap();
    reg.register_source(Arc::new(FixedSource {
        name: "second",
        families: vec![MetricFamily::counter("b_total", "b", 5.0)],
    }))
    .unwrap();
    reg.register_source(Arc::new(FixedSource {
        name: "first",
        families: vec![MetricFamily {
            name: "a_info".into(),
            help: "a".into(),
            kind: MetricKind::Gauge,
            samples: vec![
                Sample { labels: vec![("mode".into(), "x".into())], value: 1.0 },
                Sample { labels: vec![("mode".into(), "y".into())], value: 0.0 },
            ],
        }],
    }))
    .unwrap();

    let body = reg.render().unwrap();
    let g = body.find("zz_gauge{app=\"x\"} 0").unwrap();
    let b = body.find("# TYPE b_total counter").unwrap();
    let a = body.find("# TYPE a_info gauge").unwrap();
    assert!(g < b && b < a, "{body}");
    assert!(body.contains("a_info{mode=\"x\",app=\"x\"} 1\na_info{mode=\"y\",app=\"x\"} 0\n"));
    assert!(body.contains("b_total{app=\"x\"} 5\n"));
}

#[test]
fn duplicate_source_name_is_rejected() {
    let reg = Registry::new();
    let mk = || Arc::new(FixedSource { name: "process", families: vec![] });
    reg.register_source(mk()).unwrap();
    let err = reg.register_source(mk()).unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_NAME");
}

#[test]
fn failing_source_fails_whole_render() {
    let reg = Registry::new();
    reg.register_gauge("ok_gauge", "g").unwrap();
    reg.register_source(Arc::new(BrokenSource)).unwrap();

    let err = reg.render().unwrap_err();
    assert_eq!(err.code(), "SERIALIZATION");
}

#[test]
fn family_colliding_with_gauge_fails_render() {
    let reg = Registry::new();
    reg.register_gauge("process_uptime_seconds", "g").unwrap();
    reg.register_source(Arc::new(FixedSource {
        name: "process",
        families: vec![MetricFamily::gauge("process_uptime_seconds", "dup", 1.0)],
    }))
    .unwrap();

    let err = reg.render().unwrap_err();
    assert!(matches!(err, ExporterError::Serialization(_)));
}

#[test]
fn concurrent_render_never_sees_torn_value() {
    // Bit patterns chosen so any mix of the two words is neither value.
    const A: f64 = 1234567890123.0;
    const B: f64 = 0.000_000_123_456_789;

    let reg = Arc::new(Registry::new());
    let g = reg.register_gauge("flip", "flips between two values").unwrap();
    g.set(A);

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let stop = Arc::clone(&stop);
        let g = g.clone();
        std::thread::spawn(move || {
            let mut i = 0u64;
            while !stop.load(Ordering::Relaxed) {
                g.set(if i % 2 == 0 { B } else { A });
                i += 1;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let reg = Arc::clone(&reg);
            std::thread::spawn(move || {
                for _ in 0..2_000 {
                    let body = reg.render().unwrap();
                    let line = body.lines().find(|l| l.starts_with("flip ")).unwrap();
                    let v: f64 = line["flip ".len()..].parse().unwrap();
                    assert!(v == A || v == B, "torn value {v}");
                }
            })
        })
        .collect();

    for r in readers {
        r.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

/// Snapshot advances only on `refresh`; every third refresh fails.
struct Ticking {
    refreshes: AtomicU64,
    value: AtomicU64,
}

impl MetricSource for Ticking {
    fn name(&self) -> &str {
        "ticking"
    }

    fn collect(&self) -> hostmetrics_core::Result<Vec<MetricFamily>> {
        let v = self.value.load(Ordering::SeqCst) as f64;
        Ok(vec![MetricFamily::counter("ticks_total", "refreshes seen", v)])
    }

    fn refresh(&self) -> hostmetrics_core::Result<()> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 3 == 0 {
            return Err(ExporterError::OsQuery("flaky".into()));
        }
        self.value.store(n, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn renders_are_stable_between_refreshes() {
    let reg = Registry::new();
    reg.register_source(Arc::new(Ticking {
        refreshes: 0.into(),
        value: 0.into(),
    }))
    .unwrap();

    let a = reg.render().unwrap();
    let b = reg.render().unwrap();
    assert_eq!(a, b);
    assert!(a.contains("ticks_total 0\n"));

    assert_eq!(reg.refresh_sources(), 0);
    assert!(reg.render().unwrap().contains("ticks_total 1\n"));

    assert_eq!(reg.refresh_sources(), 0);
    // third refresh fails and keeps the previous snapshot
    assert_eq!(reg.refresh_sources(), 1);
    assert!(reg.render().unwrap().contains("ticks_total 2\n"));
}
