// CYCLICBENCH
// SCHEDULING-LATENCY BENCHMARK: cyclictest UNDER OPTIONAL stress-ng LOAD,
// REDUCED TO PER-THREAD MIN / MEDIAN / P99 / MAX.
//
// PIPELINE: config -> command -> orchestrator -> parser -> stats -> report
// PURE-RUST MODULES (parser, stats, report, command) ARE TESTABLE OFFLINE.

pub mod command;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod report;
pub mod stats;
pub mod topology;

pub use config::{Affinity, LoadConfig, ProbeConfig, Programs, SchedConfig, SchedPolicy};
pub use error::{BenchError, Result};
pub use orchestrator::{load_timeout_secs, LoadOutcome, RunPhase, RunReport, Runner};
pub use parser::{parse_latency, LatencyLog, LatencySample};
pub use report::{write_report, ReportFormat};
pub use stats::{calculate_stats, ThreadStats};
pub use topology::{SystemTopology, Topology};
