// CYCLICBENCH LOG PARSER
// READS `cyclictest --verbose` OUTPUT INTO PER-THREAD LATENCY BUCKETS.
//
// DATA LINES ARE "<thread>: <seq>: <latency_us>", RIGHT-ALIGNED:
//          0:       0:       9
//          1:       0:      58
// BANNERS ("Max CPUs = 8", "# /dev/cpu_dma_latency ...", "Thread 0 Interval: 1000")
// ARE IGNORED. A LINE THAT STARTS LIKE DATA BUT DOES NOT DECOMPOSE INTO
// EXACTLY THREE INTEGERS IS LOGGED AND SKIPPED -- NEVER PARTIALLY RECORDED.

use log::error;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::BenchError;

// "<digits>:" AT THE START OF THE LINE MARKS A DATA LINE
static DATA_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+:").unwrap());

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LatencySample {
    pub thread_id: usize,
    pub seq: u64,
    pub latency_us: u64,
}

/// Decode one probe output line.
///
/// `Ok(None)` for lines that are not data, `Err` for data-shaped lines that
/// are malformed.
pub fn parse_line(line: &str) -> Result<Option<LatencySample>, BenchError> {
    if !DATA_PREFIX_RE.is_match(line) {
        return Ok(None);
    }

    let malformed = |reason: String| BenchError::LogParse { line: line.to_string(), reason };

    let fields: Vec<&str> = line.split(':').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(malformed(format!("expected 3 fields, found {}", fields.len())));
    }

    let mut ints = [0u64; 3];
    for (slot, field) in ints.iter_mut().zip(&fields) {
        // DIGITS ONLY: u64::from_str WOULD ALSO TAKE A LEADING '+'
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(format!("{:?} is not an unsigned integer", field)));
        }
        *slot = field
            .parse::<u64>()
            .map_err(|e| malformed(format!("{:?} is not an unsigned integer: {}", field, e)))?;
    }

    let thread_id = usize::try_from(ints[0])
        .map_err(|_| malformed(format!("thread id {} out of range", ints[0])))?;
    Ok(Some(LatencySample { thread_id, seq: ints[1], latency_us: ints[2] }))
}

/// Per-thread latency samples in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LatencyLog {
    threads: Vec<Vec<u64>>,
    rejected: usize,
}

impl LatencyLog {
    /// Parse captured probe stdout. One bucket per configured thread,
    /// whether or not that thread produced output.
    pub fn parse(text: &str, thread_count: usize) -> Self {
        let mut threads = vec![Vec::new(); thread_count];
        let mut rejected = 0;

        for line in text.lines() {
            let sample = match parse_line(line) {
                Ok(Some(s)) => s,
                Ok(None) => continue,
                Err(e) => {
                    error!("{}", e);
                    rejected += 1;
                    continue;
                }
            };
            match threads.get_mut(sample.thread_id) {
                Some(bucket) => bucket.push(sample.latency_us),
                None => {
                    error!("{}", BenchError::LogParse {
                        line: line.to_string(),
                        reason: format!("thread id {} outside 0..{}", sample.thread_id, thread_count),
                    });
                    rejected += 1;
                }
            }
        }

        Self { threads, rejected }
    }

    pub fn thread(&self, id: usize) -> &[u64] {
        self.threads.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn threads(&self) -> &[Vec<u64>] {
        &self.threads
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn total_samples(&self) -> usize {
        self.threads.iter().map(Vec::len).sum()
    }

    /// Data-shaped lines that were logged and skipped.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn into_threads(self) -> Vec<Vec<u64>> {
        self.threads
    }
}

/// Convenience wrapper returning only the per-thread buckets.
pub fn parse_latency(text: &str, thread_count: usize) -> Vec<Vec<u64>> {
    LatencyLog::parse(text, thread_count).into_threads()
}
