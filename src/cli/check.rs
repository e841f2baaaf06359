use std::process::Command;

use anyhow::{bail, Result};
use clap::Args;

use cyclicbench::command::NICE_BIN;
use cyclicbench::{SystemTopology, Topology};

use super::{is_root, ProgramArgs};

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub programs: ProgramArgs,
}

fn check_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub fn run_check(args: CheckArgs) -> Result<()> {
    println!("CYCLICBENCH DEPENDENCY CHECK");
    println!();

    let mut ok = true;
    let tools = [
        args.programs.probe_bin.as_str(),
        args.programs.load_bin.as_str(),
        NICE_BIN,
        "lscpu",
    ];
    for tool in &tools {
        if check_tool(tool) {
            println!("  {:<24}OK", tool);
        } else {
            println!("  {:<24}MISSING", tool);
            ok = false;
        }
    }
    println!();

    // RT POLICIES NEED CAP_SYS_NICE; ROOT IS THE COMMON CASE
    if is_root() {
        println!("  {:<24}YES", "root");
    } else {
        println!("  {:<24}NO (rr POLICY WILL FAIL)", "root");
    }
    println!();

    println!("TOPOLOGY:");
    let topo = SystemTopology;
    match topo.cpu_count() {
        Ok(n) => println!("  {:<24}{}", "cpus", n),
        Err(e) => {
            println!("  {:<24}UNKNOWN ({})", "cpus", e);
            ok = false;
        }
    }
    match topo.hetero_core_ranges() {
        Ok(ranges) if ranges.len() == 2 => {
            println!("  {:<24}{}", "small cores", ranges[0]);
            println!("  {:<24}{}", "big cores", ranges[1]);
        }
        Ok(ranges) => {
            println!("  {:<24}{} GROUP(S) {:?} -- small_core/big_core FALL BACK TO CPU 0",
                     "core groups", ranges.len(), ranges);
        }
        Err(e) => println!("  {:<24}UNKNOWN ({})", "core groups", e),
    }
    println!();

    if !ok {
        if !check_tool(&args.programs.probe_bin) {
            println!("  Install cyclictest: part of rt-tests");
        }
        if !check_tool(&args.programs.load_bin) {
            println!("  Install stress-ng: pacman -S stress-ng");
        }
        bail!("SOME CHECKS FAILED");
    }

    println!("ALL CHECKS PASSED");
    Ok(())
}
