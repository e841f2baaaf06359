// CYCLICBENCH PROCESS-PAIR TESTS
// FAKE PROBE AND LOAD GENERATOR SHELL SCRIPTS STAND IN FOR cyclictest AND
// stress-ng. NO ROOT, NO REAL-TIME SCHEDULING NEEDED.
//
// SERIAL: SCRIPTS ARE WRITTEN THEN EXECUTED; A CONCURRENT fork() IN ANOTHER
// TEST THREAD CAN HOLD THE WRITE FD AND FAIL THE exec WITH ETXTBSY.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serial_test::serial;

use cyclicbench::{
    Affinity, BenchError, LoadConfig, LoadOutcome, ProbeConfig, Programs, RunPhase, Runner,
    SchedConfig, SchedPolicy, ThreadStats, Topology,
};

const SCENARIO_LOG: &str = "\
Thread 0 Interval: 1000
       0:       0:       9
       0:       1:      18
       0:       2:      15
       0:       3:      14
       0:       4:      24";

// ---------------------------------------------------------------------------
// FIXTURES
// ---------------------------------------------------------------------------

struct FakeTopology;

impl Topology for FakeTopology {
    fn cpu_count(&self) -> cyclicbench::Result<usize> {
        Ok(4)
    }
    fn hetero_core_ranges(&self) -> cyclicbench::Result<Vec<String>> {
        Ok(vec!["0-1".to_string(), "2-3".to_string()])
    }
}

struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir()
            .join("cyclicbench-tests")
            .join(format!("{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("FAILED TO CREATE SCRATCH DIR");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn script(&self, name: &str, body: &str) -> String {
        let path = self.path(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("FAILED TO WRITE SCRIPT");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("FAILED TO CHMOD");
        path.to_string_lossy().into_owned()
    }

    fn probe_printing(&self, log: &str) -> String {
        self.script("probe.sh", &format!("cat <<'EOF'\n{}\nEOF", log))
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn probe_config(policy: SchedPolicy, threads: usize, affinity: Affinity) -> ProbeConfig {
    ProbeConfig {
        sched: SchedConfig::new(policy, 0),
        interval_us: 1000,
        threads,
        loops: 5,
        affinity,
    }
}

fn rt_load(workers_per_cpu: u32) -> LoadConfig {
    LoadConfig { sched: SchedConfig::new(SchedPolicy::RealTime, 20), workers_per_cpu }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default().trim().to_string()
}

// === PROBE ONLY ===

#[test]
#[serial]
fn end_to_end_without_load() {
    let scratch = Scratch::new("e2e");
    let programs = Programs {
        probe: scratch.probe_printing(SCENARIO_LOG),
        load: "/nonexistent/load".to_string(),
    };

    // NORMAL POLICY: RUNS AS `nice -n 0 probe.sh ...`
    let mut runner = Runner::new(probe_config(SchedPolicy::Normal, 1, Affinity::Default), None)
        .with_programs(programs)
        .with_topology(FakeTopology);
    let report = runner.run().expect("RUN FAILED");

    assert_eq!(
        report.stats,
        vec![ThreadStats { thread_id: 0, min: 9, median: 15, p99: 24, max: 24 }]
    );
    assert_eq!(report.load, LoadOutcome::NotConfigured);
    assert_eq!(report.log.thread(0), &[9, 18, 15, 14, 24]);
    assert_eq!(runner.phase(), RunPhase::Done);
}

#[test]
#[serial]
fn probe_receives_built_arguments() {
    let scratch = Scratch::new("args");
    let args_file = scratch.path("probe_args");
    let body = format!("echo \"$@\" > '{}'\necho '  0: 0: 5'", args_file.display());
    let programs = Programs { probe: scratch.script("probe.sh", &body), load: String::new() };

    let mut cfg = probe_config(SchedPolicy::RealTime, 2, Affinity::BigCores);
    cfg.sched.priority = 90;
    let mut runner = Runner::new(cfg, None).with_programs(programs).with_topology(FakeTopology);
    runner.run().expect("RUN FAILED");

    assert_eq!(
        read(&args_file),
        "--verbose --distance=0 --policy=rr --interval=1000 --threads=2 --loops=5 \
         --affinity=2-3 --priority=90"
    );
}

#[test]
#[serial]
fn silent_threads_are_omitted() {
    let scratch = Scratch::new("silent");
    let log = "  0: 0: 10\n  2: 0: 30\n  2: 1: 40\n";
    let programs = Programs { probe: scratch.probe_printing(log), load: String::new() };

    let mut runner = Runner::new(probe_config(SchedPolicy::RealTime, 3, Affinity::Default), None)
        .with_programs(programs)
        .with_topology(FakeTopology);
    let report = runner.run().expect("RUN FAILED");

    let ids: Vec<usize> = report.stats.iter().map(|s| s.thread_id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(report.stats[1].median, 40);
}

#[test]
#[serial]
fn malformed_probe_line_does_not_fail_run() {
    let scratch = Scratch::new("malformed");
    let programs = Programs {
        probe: scratch.probe_printing("  0: 0: 12\n  0: 1\n"),
        load: String::new(),
    };

    let mut runner = Runner::new(probe_config(SchedPolicy::RealTime, 1, Affinity::Default), None)
        .with_programs(programs)
        .with_topology(FakeTopology);
    let report = runner.run().expect("RUN FAILED");

    assert_eq!(report.log.rejected(), 1);
    assert_eq!(report.log.thread(0), &[12]);
    assert_eq!(report.stats.len(), 1);
}

#[test]
#[serial]
fn probe_failure_is_fatal() {
    let scratch = Scratch::new("probe-fail");
    let body = "echo '  0: 0: 5'\necho 'sched_setscheduler: Operation not permitted' >&2\nexit 1";
    let programs = Programs { probe: scratch.script("probe.sh", body), load: String::new() };

    let mut runner = Runner::new(probe_config(SchedPolicy::RealTime, 1, Affinity::Default), None)
        .with_programs(programs)
        .with_topology(FakeTopology);

    match runner.run() {
        Err(BenchError::ProbeExecution { code, stdout, stderr }) => {
            assert_eq!(code, Some(1));
            assert!(stdout.contains("0: 0: 5"));
            assert!(stderr.contains("Operation not permitted"));
        }
        other => panic!("EXPECTED PROBE FAILURE, GOT {:?}", other.map(|r| r.stats)),
    }
    assert_eq!(runner.phase(), RunPhase::Failed);
}

// === PROBE + LOAD ===

#[test]
#[serial]
fn load_runs_in_load_dir_and_is_awaited() {
    let scratch = Scratch::new("load-ok");
    let load_dir = scratch.path("work");
    fs::create_dir_all(&load_dir).expect("FAILED TO CREATE LOAD DIR");

    // RELATIVE WRITE: LANDS IN THE LOAD GENERATOR'S CWD
    let load = scratch.script("load.sh", "sleep 0.2\necho \"$@\" > load_args");
    let programs = Programs { probe: scratch.probe_printing(SCENARIO_LOG), load };

    let mut runner = Runner::new(probe_config(SchedPolicy::RealTime, 1, Affinity::Default), Some(rt_load(2)))
        .with_programs(programs)
        .with_topology(FakeTopology)
        .with_load_dir(&load_dir);
    let report = runner.run().expect("RUN FAILED");

    assert_eq!(report.load, LoadOutcome::Completed);
    // WRITTEN AFTER THE PROBE FINISHED: PRESENT ONLY IF THE LOAD WAS AWAITED
    assert_eq!(read(&load_dir.join("load_args")), "--timeout=1s --cpu=8 --sched=rr --sched-prio=20");
    assert_eq!(report.stats[0].median, 15);
    assert_eq!(runner.phase(), RunPhase::Done);
}

#[test]
#[serial]
fn load_spawned_before_measurement_starts() {
    let scratch = Scratch::new("load-first");
    let load_dir = scratch.path("work");
    fs::create_dir_all(&load_dir).expect("FAILED TO CREATE LOAD DIR");
    let marker = load_dir.join("started");

    // MEASURER WAITS UP TO 1s FOR THE LOAD'S MARKER, FAILS WITHOUT IT
    let measurer = format!(
        "i=0\nwhile [ $i -lt 20 ]; do\n  if [ -f '{}' ]; then echo '  0: 0: 1'; exit 0; fi\n  \
         sleep 0.05\n  i=$((i+1))\ndone\nexit 1",
        marker.display()
    );
    let programs = Programs {
        probe: scratch.script("measure.sh", &measurer),
        load: scratch.script("load.sh", "touch started\nsleep 0.3"),
    };

    let mut runner = Runner::new(probe_config(SchedPolicy::RealTime, 1, Affinity::Default), Some(rt_load(1)))
        .with_programs(programs)
        .with_topology(FakeTopology)
        .with_load_dir(&load_dir);
    let report = runner.run().expect("LOAD WAS NOT RUNNING WHEN MEASUREMENT STARTED");

    assert_eq!(report.log.total_samples(), 1);
    assert_eq!(report.load, LoadOutcome::Completed);
    assert_eq!(runner.phase(), RunPhase::Done);
}

#[test]
#[serial]
fn load_failure_is_advisory() {
    let scratch = Scratch::new("load-fail");
    let programs = Programs {
        probe: scratch.probe_printing(SCENARIO_LOG),
        load: scratch.script("load.sh", "exit 3"),
    };

    let mut runner = Runner::new(probe_config(SchedPolicy::RealTime, 1, Affinity::Default), Some(rt_load(1)))
        .with_programs(programs)
        .with_topology(FakeTopology)
        .with_load_dir(&scratch.dir);
    let report = runner.run().expect("LOAD FAILURE MUST NOT ABORT THE RUN");

    match &report.load {
        LoadOutcome::Failed(reason) => assert!(reason.contains("exit code 3"), "{}", reason),
        other => panic!("EXPECTED LOAD FAILURE, GOT {:?}", other),
    }
    assert_eq!(report.stats[0].min, 9);
    assert_eq!(runner.phase(), RunPhase::Done);
}

#[test]
#[serial]
fn missing_load_binary_is_fatal() {
    let scratch = Scratch::new("load-missing");
    let programs = Programs {
        probe: scratch.probe_printing(SCENARIO_LOG),
        load: scratch.path("no-such-load").to_string_lossy().into_owned(),
    };

    let mut runner = Runner::new(probe_config(SchedPolicy::RealTime, 1, Affinity::Default), Some(rt_load(1)))
        .with_programs(programs)
        .with_topology(FakeTopology)
        .with_load_dir(&scratch.dir);

    assert!(matches!(runner.run(), Err(BenchError::Spawn { .. })));
    assert_eq!(runner.phase(), RunPhase::Failed);
}

#[test]
#[serial]
fn repeated_runs_are_identical() {
    let scratch = Scratch::new("repeat");
    let programs = Programs { probe: scratch.probe_printing(SCENARIO_LOG), load: String::new() };
    let cfg = probe_config(SchedPolicy::RealTime, 1, Affinity::Default);

    let first = Runner::new(cfg.clone(), None)
        .with_programs(programs.clone())
        .with_topology(FakeTopology)
        .run()
        .expect("FIRST RUN FAILED");
    let second = Runner::new(cfg, None)
        .with_programs(programs)
        .with_topology(FakeTopology)
        .run()
        .expect("SECOND RUN FAILED");

    assert_eq!(first.log, second.log);
    assert_eq!(first.stats, second.stats);
}
