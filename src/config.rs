// CYCLICBENCH RUN CONFIGURATION
// PURE DATA: NO PROCESS OR PLATFORM ACCESS. ALL POLICY-SPECIFIC BEHAVIOR
// LIVES IN command.rs.

use crate::error::{BenchError, Result};

// DEFAULTS (MATCH THE CLI)

pub const DEFAULT_INTERVAL_US: u64     = 10_000;  // 10MS
pub const DEFAULT_LOOPS: u64           = 6_000;   // 60S AT THE DEFAULT INTERVAL
pub const DEFAULT_THREADS: usize       = 1;
pub const DEFAULT_STRESS_PRIORITY: i32 = 20;
pub const DEFAULT_STRESS_WORKERS: u32  = 2;

pub const DEFAULT_PROBE_BIN: &str = "cyclictest";
pub const DEFAULT_LOAD_BIN: &str  = "stress-ng";

// SCHEDULING POLICY

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SchedPolicy {
    RealTime,
    Normal,
}

impl SchedPolicy {
    // SPELLING USED ON BOTH THE PROBE AND LOAD GENERATOR COMMAND LINES
    pub fn label(self) -> &'static str {
        match self {
            Self::RealTime => "rr",
            Self::Normal => "other",
        }
    }
}

// PRIORITY IS AN RT PRIORITY FOR RealTime, A NICE VALUE FOR Normal.
// SIGN IS PASSED THROUGH VERBATIM.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SchedConfig {
    pub policy: SchedPolicy,
    pub priority: i32,
}

impl SchedConfig {
    pub fn new(policy: SchedPolicy, priority: i32) -> Self {
        Self { policy, priority }
    }
}

// AFFINITY CLASS

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Affinity {
    /// No restriction: probe threads round-robin across all cores.
    #[default]
    Default,
    SmallCores,
    BigCores,
}

impl Affinity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::SmallCores => "small_core",
            Self::BigCores => "big_core",
        }
    }
}

// PROBE CONFIG

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    pub sched: SchedConfig,
    pub interval_us: u64,
    pub threads: usize,
    pub loops: u64,
    pub affinity: Affinity,
}

impl ProbeConfig {
    /// Reject configurations the probe cannot run. Called before any
    /// process is launched.
    pub fn validate(&self) -> Result<()> {
        if self.interval_us == 0 {
            return Err(BenchError::Config("interval must be greater than 0us".into()));
        }
        if self.threads == 0 {
            return Err(BenchError::Config("at least one probe thread is required".into()));
        }
        if self.loops == 0 {
            return Err(BenchError::Config("at least one loop is required".into()));
        }
        Ok(())
    }

    // NOMINAL PROBE RUNTIME IN SECONDS (LOOPS * INTERVAL)
    pub fn nominal_secs(&self) -> f64 {
        self.loops as f64 * self.interval_us as f64 / 1_000_000.0
    }
}

// LOAD CONFIG. ABSENT (None) MEANS THE PROBE RUNS WITHOUT COMPETING LOAD.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadConfig {
    pub sched: SchedConfig,
    pub workers_per_cpu: u32,
}

// EXTERNAL PROGRAM NAMES, RESOLVED ON PATH AT SPAWN TIME

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Programs {
    pub probe: String,
    pub load: String,
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            probe: DEFAULT_PROBE_BIN.to_string(),
            load: DEFAULT_LOAD_BIN.to_string(),
        }
    }
}
