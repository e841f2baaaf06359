// OFFLINE REDUCTION OF AN ALREADY-CAPTURED cyclictest --verbose LOG

use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Args;
use log::{info, warn};

use cyclicbench::{write_report, LatencyLog};

use super::{OutputArgs, STDIO_PATH};

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Number of probe threads the log was captured with
    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Captured probe output ("-" for stdin)
    #[arg(default_value = STDIO_PATH)]
    pub input: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run_parse(args: ParseArgs) -> Result<()> {
    if args.threads == 0 {
        bail!("at least one thread is required");
    }

    let text = if args.input == STDIO_PATH {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read probe log from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read probe log {}", args.input))?
    };

    let log = LatencyLog::parse(&text, args.threads);
    if log.rejected() > 0 {
        warn!("{} MALFORMED LINES SKIPPED", log.rejected());
    }
    info!("PARSED {} SAMPLES ACROSS {} THREADS", log.total_samples(), log.thread_count());

    let mut sink = args.output.open()?;
    write_report(&log.stats(), args.output.format(), &mut sink)
        .context("failed to write report")?;
    Ok(())
}
