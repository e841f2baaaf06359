// CYCLICBENCH CLI SUBCOMMANDS
// THIN ADAPTERS: PARSE ARGS, CALL THE LIBRARY, PICK THE OUTPUT SINK.

pub mod check;
pub mod parse;
pub mod run;

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use cyclicbench::config::{DEFAULT_LOAD_BIN, DEFAULT_PROBE_BIN};
use cyclicbench::{Affinity, Programs, ReportFormat, SchedPolicy};

// "-" MEANS STDOUT / STDIN
pub const STDIO_PATH: &str = "-";

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PolicyArg {
    /// Real-time round-robin
    Rr,
    /// Normal (CFS/EEVDF) scheduling
    Other,
}

impl From<PolicyArg> for SchedPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Rr => SchedPolicy::RealTime,
            PolicyArg::Other => SchedPolicy::Normal,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum AffinityArg {
    /// All processors, round-robin
    #[default]
    Default,
    #[value(name = "small_core")]
    SmallCore,
    #[value(name = "big_core")]
    BigCore,
}

impl From<AffinityArg> for Affinity {
    fn from(a: AffinityArg) -> Self {
        match a {
            AffinityArg::Default => Affinity::Default,
            AffinityArg::SmallCore => Affinity::SmallCores,
            AffinityArg::BigCore => Affinity::BigCores,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ProgramArgs {
    /// Latency probe executable
    #[arg(long, env = "CYCLICBENCH_PROBE_BIN", default_value = DEFAULT_PROBE_BIN)]
    pub probe_bin: String,

    /// Load generator executable
    #[arg(long, env = "CYCLICBENCH_LOAD_BIN", default_value = DEFAULT_LOAD_BIN)]
    pub load_bin: String,
}

impl ProgramArgs {
    pub fn programs(&self) -> Programs {
        Programs { probe: self.probe_bin.clone(), load: self.load_bin.clone() }
    }
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output file for the report ("-" for stdout)
    #[arg(short, long, default_value = STDIO_PATH)]
    pub output: String,

    /// Write the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl OutputArgs {
    pub fn format(&self) -> ReportFormat {
        if self.json { ReportFormat::Json } else { ReportFormat::Text }
    }

    // OPENED ONLY ONCE THERE IS SOMETHING TO WRITE: A FAILED RUN LEAVES NO FILE
    pub fn open(&self) -> Result<Box<dyn Write>> {
        if self.output == STDIO_PATH {
            return Ok(Box::new(io::stdout().lock()));
        }
        let file = File::create(&self.output)
            .with_context(|| format!("failed to create output file {}", self.output))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
