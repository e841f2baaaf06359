// CYCLICBENCH ERRORS
// FATAL KINDS ARE RETURNED TO THE CALLER. ADVISORY KINDS (AFFINITY, LOAD,
// LOG PARSE) ARE ONLY EVER LOGGED -- THE RUN CONTINUES PAST THEM.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Probe or load configuration rejected before anything was launched.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// CPU count or core attribute data could not be read or parsed.
    #[error("topology error: {0}")]
    Topology(String),

    /// Requested affinity class could not be mapped to a core range.
    #[error("affinity resolution failed: {0}")]
    AffinityResolution(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Probe exited non-zero. No statistics are produced.
    #[error("probe exited with {}", exit_label(.code))]
    ProbeExecution {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Load generator exited non-zero or could not be waited on.
    #[error("load generator failed: {0}")]
    LoadExecution(String),

    #[error("failed to parse latency line {line:?}: {reason}")]
    LogParse { line: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;

// NONE MEANS THE PROCESS WAS KILLED BY A SIGNAL
pub(crate) fn exit_label(code: &Option<i32>) -> String {
    match *code {
        Some(c) => format!("exit code {}", c),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
