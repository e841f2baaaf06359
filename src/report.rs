// CYCLICBENCH REPORT
// TEXT: ONE "Thread #N:" BLOCK PER THREAD. JSON: {"stats": [...]}.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::stats::ThreadStats;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    stats: &'a [ThreadStats],
}

/// Write per-thread statistics to `sink`.
pub fn write_report<W: Write>(stats: &[ThreadStats], format: ReportFormat, sink: &mut W) -> Result<()> {
    match format {
        ReportFormat::Text => {
            for s in stats {
                writeln!(sink, "Thread #{}:", s.thread_id)?;
                writeln!(sink, "min: {}", s.min)?;
                writeln!(sink, "median: {}", s.median)?;
                writeln!(sink, "p99: {}", s.p99)?;
                writeln!(sink, "max: {}", s.max)?;
            }
        }
        ReportFormat::Json => {
            serde_json::to_writer(&mut *sink, &JsonReport { stats })
                .map_err(std::io::Error::from)?;
            writeln!(sink)?;
        }
    }
    sink.flush()?;
    Ok(())
}
