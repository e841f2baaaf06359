use anyhow::{Context, Result};
use clap::Args;
use log::{info, warn};

use cyclicbench::config::{
    DEFAULT_INTERVAL_US, DEFAULT_LOOPS, DEFAULT_STRESS_PRIORITY, DEFAULT_STRESS_WORKERS,
    DEFAULT_THREADS,
};
use cyclicbench::{write_report, LoadConfig, ProbeConfig, Runner, SchedConfig, SchedPolicy};

use super::{is_root, AffinityArg, OutputArgs, PolicyArg, ProgramArgs};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scheduling policy of the probe
    #[arg(long, value_enum)]
    pub policy: PolicyArg,

    /// Probe priority: real-time priority for `rr`, nice value for `other`
    #[arg(long, allow_negative_numbers = true)]
    pub priority: i32,

    /// Probe wakeup interval in microseconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_US)]
    pub interval: u64,

    /// Number of probe threads
    #[arg(long, default_value_t = DEFAULT_THREADS)]
    pub threads: usize,

    /// Number of intervals each probe thread measures
    #[arg(long, default_value_t = DEFAULT_LOOPS)]
    pub loops: u64,

    /// Set of processors the probe threads run on
    #[arg(long, value_enum, default_value_t = AffinityArg::Default)]
    pub affinity: AffinityArg,

    /// Scheduling policy of the load generator (no load when omitted)
    #[arg(long, value_enum)]
    pub stress_policy: Option<PolicyArg>,

    /// Load generator priority: real-time priority for `rr`, nice value for `other`
    #[arg(long, allow_negative_numbers = true, default_value_t = DEFAULT_STRESS_PRIORITY)]
    pub stress_priority: i32,

    /// Load generator workers per CPU
    #[arg(long, default_value_t = DEFAULT_STRESS_WORKERS)]
    pub workers_per_cpu: u32,

    #[command(flatten)]
    pub programs: ProgramArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl RunArgs {
    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            sched: SchedConfig::new(self.policy.into(), self.priority),
            interval_us: self.interval,
            threads: self.threads,
            loops: self.loops,
            affinity: self.affinity.into(),
        }
    }

    pub fn load_config(&self) -> Option<LoadConfig> {
        self.stress_policy.map(|policy| LoadConfig {
            sched: SchedConfig::new(policy.into(), self.stress_priority),
            workers_per_cpu: self.workers_per_cpu,
        })
    }
}

pub fn run_bench(args: RunArgs) -> Result<()> {
    let probe = args.probe_config();
    let load = args.load_config();

    let wants_rt = probe.sched.policy == SchedPolicy::RealTime
        || load.as_ref().is_some_and(|l| l.sched.policy == SchedPolicy::RealTime);
    if wants_rt && !is_root() {
        warn!("REAL-TIME POLICY REQUESTED WITHOUT ROOT -- THE PROBE WILL LIKELY FAIL");
    }

    info!(
        "PROBE: policy={} priority={} interval={}us threads={} loops={} affinity={}",
        probe.sched.policy.label(), probe.sched.priority, probe.interval_us,
        probe.threads, probe.loops, probe.affinity.label()
    );
    match &load {
        Some(l) => info!(
            "LOAD:  policy={} priority={} workers/cpu={}",
            l.sched.policy.label(), l.sched.priority, l.workers_per_cpu
        ),
        None => info!("LOAD:  none"),
    }

    let mut runner = Runner::new(probe, load).with_programs(args.programs.programs());
    let report = runner.run().context("benchmark run failed")?;

    info!(
        "COLLECTED {} SAMPLES ACROSS {} THREADS ({} REPORTED)",
        report.log.total_samples(),
        report.log.thread_count(),
        report.stats.len()
    );

    let mut sink = args.output.open()?;
    write_report(&report.stats, args.output.format(), &mut sink)
        .context("failed to write report")?;
    Ok(())
}
