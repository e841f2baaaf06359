// CYCLICBENCH STATISTICS
// ORDER STATISTICS OVER ONE THREAD'S LATENCIES: MIN / MEDIAN / P99 / MAX.
//
// INDEX RULE: sorted[n * p / 100] WITH INTEGER DIVISION. THE MEDIAN IS
// sorted[n / 2] -- THE UPPER MIDDLE FOR EVEN n, NEVER AN AVERAGE.

use serde::Serialize;

use crate::parser::LatencyLog;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct ThreadStats {
    pub thread_id: usize,
    pub min: u64,
    pub median: u64,
    pub p99: u64,
    pub max: u64,
}

impl ThreadStats {
    /// Reduce one thread's samples. `None` when the thread produced nothing.
    /// The input order is left untouched.
    pub fn from_samples(thread_id: usize, samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        Some(Self {
            thread_id,
            min: sorted[0],
            median: percentile(&sorted, 50),
            p99: percentile(&sorted, 99),
            max: sorted[sorted.len() - 1],
        })
    }
}

// sorted_vals MUST BE NON-EMPTY AND ASCENDING
pub fn percentile(sorted_vals: &[u64], p: usize) -> u64 {
    let idx = sorted_vals.len() * p / 100;
    sorted_vals[idx.min(sorted_vals.len() - 1)]
}

/// Statistics for every thread that produced samples, in thread order.
/// Silent threads are omitted, not reported as zeros.
pub fn calculate_stats(latencies: &[Vec<u64>]) -> Vec<ThreadStats> {
    latencies
        .iter()
        .enumerate()
        .filter_map(|(tid, samples)| ThreadStats::from_samples(tid, samples))
        .collect()
}

impl LatencyLog {
    pub fn stats(&self) -> Vec<ThreadStats> {
        calculate_stats(self.threads())
    }
}
