// CYCLICBENCH PROCESS ORCHESTRATOR
// RUNS THE LOAD GENERATOR (OPTIONAL) AND THE PROBE AS A PROCESS PAIR.
//
// ORDERING:
//   1. LOAD GENERATOR SPAWNED, NOT AWAITED (IT RAMPS WHILE THE PROBE STARTS)
//   2. PROBE SPAWNED AND AWAITED, STDOUT/STDERR CAPTURED IN FULL
//   3. LOAD GENERATOR AWAITED ONLY AFTER THE PROBE EXITED
//
// THE LOAD GENERATOR BOUNDS ITSELF WITH --timeout; IT IS NEVER KILLED HERE.
// THE PROBE HAS NO TIMEOUT: IF IT HANGS, THE RUN HANGS.
// PROBE FAILURE IS FATAL. LOAD GENERATOR FAILURE IS LOGGED ONLY.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use log::{debug, error, info, warn};

use crate::command::{load_command, probe_command};
use crate::config::{LoadConfig, ProbeConfig, Programs};
use crate::error::{exit_label, BenchError, Result};
use crate::parser::LatencyLog;
use crate::stats::ThreadStats;
use crate::topology::{SystemTopology, Topology};

// MARGIN OVER THE PROBE'S NOMINAL RUNTIME BEFORE THE LOAD GENERATOR STOPS ITSELF
const LOAD_TIMEOUT_MARGIN: f64 = 1.1;

/// Load generator timeout: nominal probe runtime plus 10%, rounded, at least
/// one second (a zero timeout would make the load generator run forever).
pub fn load_timeout_secs(config: &ProbeConfig) -> u64 {
    let secs = (config.nominal_secs() * LOAD_TIMEOUT_MARGIN).round() as u64;
    secs.max(1)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunPhase {
    Idle,
    LoadStarted,
    ProbeRunning,
    ProbeComplete,
    LoadVerified,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "IDLE",
            Self::LoadStarted => "LOAD_STARTED",
            Self::ProbeRunning => "PROBE_RUNNING",
            Self::ProbeComplete => "PROBE_COMPLETE",
            Self::LoadVerified => "LOAD_VERIFIED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No load config: the probe ran alone.
    NotConfigured,
    Completed,
    /// Exited non-zero or could not be awaited. Probe data is still reported.
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub stats: Vec<ThreadStats>,
    pub log: LatencyLog,
    pub load: LoadOutcome,
}

pub struct Runner {
    probe: ProbeConfig,
    load: Option<LoadConfig>,
    programs: Programs,
    topology: Box<dyn Topology>,
    load_dir: PathBuf,
    phase: RunPhase,
}

impl Runner {
    pub fn new(probe: ProbeConfig, load: Option<LoadConfig>) -> Self {
        Self {
            probe,
            load,
            programs: Programs::default(),
            topology: Box::new(SystemTopology),
            // LOAD GENERATOR NEEDS A READ/WRITE CWD; THE CALLER'S MAY BE READ-ONLY
            load_dir: std::env::temp_dir(),
            phase: RunPhase::Idle,
        }
    }

    pub fn with_programs(mut self, programs: Programs) -> Self {
        self.programs = programs;
        self
    }

    pub fn with_topology(mut self, topology: impl Topology + 'static) -> Self {
        self.topology = Box::new(topology);
        self
    }

    pub fn with_load_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.load_dir = dir.into();
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn load_dir(&self) -> &Path {
        &self.load_dir
    }

    /// Run the probe (with load if configured) and reduce its output.
    pub fn run(&mut self) -> Result<RunReport> {
        match self.execute() {
            Ok(report) => {
                self.transition(RunPhase::Done);
                Ok(report)
            }
            Err(e) => {
                self.transition(RunPhase::Failed);
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<RunReport> {
        self.probe.validate()?;

        let timeout = load_timeout_secs(&self.probe);
        let probe_cmd = probe_command(&self.probe, &self.programs, self.topology.as_ref())?;
        let load_cmd = load_command(self.load.as_ref(), timeout, &self.programs, self.topology.as_ref())?;

        // LOAD FIRST, SO IT IS ALREADY RAMPING WHEN MEASUREMENT BEGINS
        let load_child = if load_cmd.is_empty() {
            None
        } else {
            let child = spawn_load(&load_cmd, &self.load_dir)?;
            self.transition(RunPhase::LoadStarted);
            Some(child)
        };

        info!("EXECUTE COMMAND: {}", probe_cmd.join(" "));
        self.transition(RunPhase::ProbeRunning);
        let output = build(&probe_cmd)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| BenchError::Spawn { program: probe_cmd[0].clone(), source: e })?;
        self.transition(RunPhase::ProbeComplete);

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("FAILED TO EXECUTE PROBE: {}", exit_label(&output.status.code()));
            error!("STDOUT: {}", stdout);
            error!("STDERR: {}", stderr);
            if load_child.is_some() {
                warn!("LOAD GENERATOR LEFT TO EXPIRE ON ITS OWN ({}s TIMEOUT)", timeout);
            }
            return Err(BenchError::ProbeExecution {
                code: output.status.code(),
                stdout: stdout.into_owned(),
                stderr: stderr.into_owned(),
            });
        }

        let load = match load_child {
            Some(child) => {
                let outcome = verify_load(child, &load_cmd);
                self.transition(RunPhase::LoadVerified);
                outcome
            }
            None => LoadOutcome::NotConfigured,
        };

        let log = LatencyLog::parse(&stdout, self.probe.threads);
        if log.rejected() > 0 {
            warn!("{} MALFORMED PROBE LINES SKIPPED", log.rejected());
        }
        let expected = self.probe.loops as usize;
        for (tid, samples) in log.threads().iter().enumerate() {
            if samples.len() < expected {
                debug!("THREAD {}: {} OF {} SAMPLES", tid, samples.len(), expected);
            }
        }

        let stats = log.stats();
        Ok(RunReport { stats, log, load })
    }

    fn transition(&mut self, next: RunPhase) {
        debug!("RUN PHASE: {} -> {}", self.phase, next);
        self.phase = next;
    }
}

// ---------------------------------------------------------------------------
// PROCESS HELPERS
// ---------------------------------------------------------------------------

// argv IS NEVER EMPTY: BOTH BUILDERS START WITH A PROGRAM NAME
fn build(argv: &[String]) -> Command {
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);
    cmd
}

fn spawn_load(argv: &[String], dir: &Path) -> Result<Child> {
    info!("EXECUTE COMMAND: {}", argv.join(" "));
    build(argv)
        .current_dir(dir)
        .stdin(Stdio::null())
        // KEEP THE REPORT STREAM CLEAN WHEN IT GOES TO STDOUT
        .stdout(Stdio::null())
        .spawn()
        .map_err(|e| BenchError::Spawn { program: argv[0].clone(), source: e })
}

fn verify_load(mut child: Child, argv: &[String]) -> LoadOutcome {
    let failure = match child.wait() {
        Ok(status) if status.success() => return LoadOutcome::Completed,
        Ok(status) => BenchError::LoadExecution(format!(
            "{} finished with {}", argv.join(" "), exit_label(&status.code())
        )),
        Err(e) => BenchError::LoadExecution(format!("failed to wait for {}: {}", argv[0], e)),
    };
    error!("{}", failure);
    LoadOutcome::Failed(failure.to_string())
}
