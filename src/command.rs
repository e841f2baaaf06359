// CYCLICBENCH COMMAND BUILDER
// TURNS PROBE/LOAD CONFIGS INTO EXACT ARGUMENT VECTORS.
//
// REAL-TIME POLICY: PRIORITY GOES TO THE PROGRAM ITSELF (--priority, --sched-prio).
// NORMAL POLICY:    THE WHOLE COMMAND IS WRAPPED IN `nice -n <priority>`.

use crate::config::{LoadConfig, ProbeConfig, Programs, SchedConfig, SchedPolicy};
use crate::error::{BenchError, Result};
use crate::topology::{resolve_affinity, Topology};

pub const NICE_BIN: &str = "nice";

/// Argument vector for the latency probe.
pub fn probe_command(
    config: &ProbeConfig,
    programs: &Programs,
    topology: &dyn Topology,
) -> Result<Vec<String>> {
    let mut cmd = vec![
        programs.probe.clone(),
        "--verbose".to_string(),
        // THREAD i RUNS AT interval + i * distance; 0 KEEPS ALL THREADS EQUAL
        "--distance=0".to_string(),
        format!("--policy={}", config.sched.policy.label()),
        format!("--interval={}", config.interval_us),
        format!("--threads={}", config.threads),
        format!("--loops={}", config.loops),
    ];
    if let Some(range) = resolve_affinity(config.affinity, topology)? {
        cmd.push(format!("--affinity={}", range));
    }
    Ok(apply_priority(cmd, config.sched, "--priority"))
}

/// Argument vector for the load generator, or an empty vector when no load
/// is configured.
pub fn load_command(
    config: Option<&LoadConfig>,
    timeout_secs: u64,
    programs: &Programs,
    topology: &dyn Topology,
) -> Result<Vec<String>> {
    let config = match config {
        Some(c) => c,
        None => return Ok(Vec::new()),
    };

    let cpus = topology.cpu_count()?;
    let workers = (config.workers_per_cpu as usize)
        .checked_mul(cpus)
        .ok_or_else(|| BenchError::Config(format!(
            "{} workers per cpu x {} cpus overflows", config.workers_per_cpu, cpus
        )))?;

    let cmd = vec![
        programs.load.clone(),
        format!("--timeout={}s", timeout_secs),
        format!("--cpu={}", workers),
        format!("--sched={}", config.sched.policy.label()),
    ];
    Ok(apply_priority(cmd, config.sched, "--sched-prio"))
}

fn apply_priority(mut cmd: Vec<String>, sched: SchedConfig, rt_flag: &str) -> Vec<String> {
    match sched.policy {
        SchedPolicy::RealTime => {
            cmd.push(format!("{}={}", rt_flag, sched.priority));
            cmd
        }
        SchedPolicy::Normal => {
            let mut wrapped = vec![
                NICE_BIN.to_string(),
                "-n".to_string(),
                sched.priority.to_string(),
            ];
            wrapped.extend(cmd);
            wrapped
        }
    }
}
