// CYCLICBENCH TOPOLOGY INSPECTOR
// CPU COUNT FROM lscpu, HETEROGENEOUS CORE GROUPS FROM /proc/cpuinfo.
//
// ARM big.LITTLE PARTS REPORT A DISTINCT "CPU part" PER CORE TYPE; x86
// REPORTS NONE. CONSECUTIVE CORES WITH THE SAME PART COLLAPSE INTO ONE
// "<first>-<last>" RANGE. SMALL CORES ARE ASSUMED TO COME FIRST.
//
// EVERY QUERY HITS THE PLATFORM FRESH -- CORES CAN BE HOTPLUGGED OR
// RECONFIGURED BETWEEN RUNS IN A TEST LAB.

use std::process::Command;

use log::error;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Affinity;
use crate::error::{BenchError, Result};

const LSCPU_BIN: &str = "lscpu";
const CPUINFO_PATH: &str = "/proc/cpuinfo";

// FALLBACK WHEN THE CORE GROUPS CANNOT BE MAPPED TO SMALL/BIG
pub const FALLBACK_AFFINITY: &str = "0";

static CPU_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^CPU\(s\):\s*(\d+)\s*$").unwrap());
static CPU_PART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^CPU part\s+:\s+(0x[0-9a-fA-F]+)\s*$").unwrap());

/// Platform CPU layout as needed to build probe and load commands.
pub trait Topology {
    /// Number of CPUs the platform reports.
    fn cpu_count(&self) -> Result<usize>;

    /// Ranges of consecutive cores sharing a hardware part, in core order.
    /// Empty on homogeneous platforms that report no part at all.
    fn hetero_core_ranges(&self) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// SYSTEM TOPOLOGY
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTopology;

impl Topology for SystemTopology {
    fn cpu_count(&self) -> Result<usize> {
        let output = Command::new(LSCPU_BIN)
            .output()
            .map_err(|e| BenchError::Topology(format!("failed to run {}: {}", LSCPU_BIN, e)))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_cpu_count(&stdout)
    }

    fn hetero_core_ranges(&self) -> Result<Vec<String>> {
        let cpuinfo = std::fs::read_to_string(CPUINFO_PATH)
            .map_err(|e| BenchError::Topology(format!("failed to read {}: {}", CPUINFO_PATH, e)))?;
        let ranges = parse_core_ranges(&cpuinfo);
        if ranges.is_empty() {
            error!("NO CPU PART ENTRIES IN {} -- CANNOT GROUP CORES", CPUINFO_PATH);
        }
        Ok(ranges)
    }
}

// ---------------------------------------------------------------------------
// PARSERS
// ---------------------------------------------------------------------------

/// Extract the `CPU(s):` count from `lscpu` output.
pub fn parse_cpu_count(lscpu: &str) -> Result<usize> {
    for line in lscpu.lines() {
        if let Some(caps) = CPU_COUNT_RE.captures(line.trim_end()) {
            return caps[1]
                .parse::<usize>()
                .map_err(|e| BenchError::Topology(format!("bad cpu count {:?}: {}", &caps[1], e)));
        }
    }
    Err(BenchError::Topology(format!(
        "no CPU(s) line in {} output: {:?}",
        LSCPU_BIN,
        lscpu.trim()
    )))
}

/// Group `/proc/cpuinfo` cores into ranges of identical `CPU part` values.
pub fn parse_core_ranges(cpuinfo: &str) -> Vec<String> {
    let mut ranges = Vec::new();
    let mut current: Option<(&str, usize)> = None; // (PART, FIRST CORE)
    let mut cpu_id = 0usize;

    for line in cpuinfo.lines() {
        let caps = match CPU_PART_RE.captures(line) {
            Some(c) => c,
            None => continue,
        };
        let part = caps.get(1).map_or("", |m| m.as_str());
        match current {
            Some((prev, start)) if prev != part => {
                ranges.push(format!("{}-{}", start, cpu_id - 1));
                current = Some((part, cpu_id));
            }
            None => current = Some((part, cpu_id)),
            _ => {}
        }
        cpu_id += 1;
    }

    if let Some((_, start)) = current {
        ranges.push(format!("{}-{}", start, cpu_id - 1));
    }
    ranges
}

// ---------------------------------------------------------------------------
// AFFINITY RESOLUTION
// ---------------------------------------------------------------------------

/// Map an affinity class to a concrete CPU range for the probe.
///
/// Returns `None` for [`Affinity::Default`] (no restriction). Anything other
/// than exactly two core groups, or core data that cannot be read, is logged
/// and degrades to CPU 0.
pub fn resolve_affinity(affinity: Affinity, topology: &dyn Topology) -> Result<Option<String>> {
    let index = match affinity {
        Affinity::Default => return Ok(None),
        Affinity::SmallCores => 0,
        Affinity::BigCores => 1,
    };

    // UNREADABLE CORE DATA DEGRADES LIKE A WRONG GROUP COUNT: CPU 0, NOT AN ABORT
    let ranges = match topology.hetero_core_ranges() {
        Ok(r) => r,
        Err(e) => {
            error!("{}", BenchError::AffinityResolution(format!(
                "{}; pinning to cpu {}", e, FALLBACK_AFFINITY
            )));
            return Ok(Some(FALLBACK_AFFINITY.to_string()));
        }
    };
    if ranges.len() != 2 {
        let err = BenchError::AffinityResolution(format!(
            "expected 2 types of heterogeneous cores, found {} ({:?}); pinning to cpu {}",
            ranges.len(),
            ranges,
            FALLBACK_AFFINITY
        ));
        error!("{}", err);
        return Ok(Some(FALLBACK_AFFINITY.to_string()));
    }
    Ok(Some(ranges[index].clone()))
}
