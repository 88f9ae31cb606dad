//! `/proc/stat` per-core counter parsing.
//!
//! Each `cpuN` line reads `user nice system idle iowait irq softirq ...` in
//! USER_HZ ticks. The aggregate `cpu` line is skipped; cores are summed by the
//! caller. iowait and softirq are not accounted, matching the five-category
//! breakdown the gauge is defined over.

use hostmetrics_core::cpu::CpuTimes;
use hostmetrics_core::error::{ExporterError, Result};

pub const PROC_STAT: &str = "/proc/stat";

fn is_core_line(tag: &str) -> bool {
    tag.strip_prefix("cpu")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

pub fn parse_per_core(raw: &str) -> Result<Vec<CpuTimes>> {
    let mut cores = Vec::new();

    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else { continue };
        if !is_core_line(tag) {
            continue;
        }

        let fields = parts
            .map(|s| s.parse::<u64>())
            .collect::<std::result::Result<Vec<u64>, _>>()
            .map_err(|e| ExporterError::OsQuery(format!("{tag}: bad counter: {e}")))?;
        if fields.len() < 4 {
            return Err(ExporterError::OsQuery(format!(
                "{tag}: expected at least 4 counters, got {}",
                fields.len()
            )));
        }

        cores.push(CpuTimes {
            user: fields[0],
            nice: fields[1],
            system: fields[2],
            idle: fields[3],
            interrupt: fields.get(5).copied().unwrap_or(0),
        });
    }

    Ok(cores)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
cpu  300 20 100 9000 50 7 3 0 0 0
cpu0 100 10 50 4500 25 4 2 0 0 0
cpu1 200 10 50 4500 25 3 1 0 0 0
intr 123456 0 0
ctxt 987654
btime 1700000000
processes 4242
";

    #[test]
    fn parses_each_core_and_skips_aggregate() {
        let cores = parse_per_core(SAMPLE).unwrap();
        assert_eq!(cores.len(), 2);
        assert_eq!(
            cores[0],
            CpuTimes { user: 100, nice: 10, system: 50, idle: 4500, interrupt: 4 }
        );
        assert_eq!(cores[1].user, 200);
        assert_eq!(cores[1].interrupt, 3);
    }

    #[test]
    fn old_kernels_without_irq_column() {
        let cores = parse_per_core("cpu0 1 2 3 4\n").unwrap();
        assert_eq!(cores[0], CpuTimes { user: 1, nice: 2, system: 3, idle: 4, interrupt: 0 });
    }

    #[test]
    fn truncated_core_line_is_an_os_query_error() {
        let err = parse_per_core("cpu0 1 2 3\n").unwrap_err();
        assert_eq!(err.code(), "OS_QUERY");
        let err = parse_per_core("cpu0 1 x 3 4\n").unwrap_err();
        assert_eq!(err.code(), "OS_QUERY");
    }

    #[test]
    fn no_core_lines_yields_empty() {
        assert!(parse_per_core("intr 1\n").unwrap().is_empty());
    }
}
