// CYCLICBENCH -- SCHEDULING LATENCY BENCHMARK
// RUNS cyclictest (OPTIONALLY UNDER stress-ng LOAD) AND REPORTS
// PER-THREAD MIN / MEDIAN / P99 / MAX WAKEUP LATENCY
//
// ALL MEASUREMENT HAPPENS IN THE EXTERNAL PROBE.
// RUST HANDLES: COMMAND CONSTRUCTION, PROCESS ORDERING, PARSING, REPORTING

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cli::check::{run_check, CheckArgs};
use cli::parse::{run_parse, ParseArgs};
use cli::run::{run_bench, RunArgs};

#[derive(Parser)]
#[command(name = "cyclicbench")]
#[command(about = "Run cyclictest with and without stress and benchmark the latency")]
struct Cli {
    /// Log progress (info level); RUST_LOG overrides
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the probe (and load generator, if configured) and report latency
    Run(RunArgs),
    /// Check that the probe, load generator and platform tools are usable
    Check(CheckArgs),
    /// Reduce an already-captured probe log without launching anything
    Parse(ParseArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "info" } else { "warn" }
    ))
    .init();

    match cli.command {
        Cmd::Run(args) => run_bench(args),
        Cmd::Check(args) => run_check(args),
        Cmd::Parse(args) => run_parse(args),
    }
}
