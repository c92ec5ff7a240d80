//! Summary statistics over the success latency sample.
//!
//! Percentiles use linear interpolation between closest ranks: for a sorted
//! sample of `n` values and rank `p`, the position is `(p / 100) * (n - 1)`;
//! an integral position selects that element, otherwise the two bracketing
//! elements are interpolated. This is the default method of most statistics
//! libraries.
//!
//! An empty sample has no defined mean or percentile. Both functions return
//! [`LATENCY_SENTINEL`] (`0.0`) in that case so downstream consumers always
//! receive a number.

use serde::{Deserialize, Serialize};

/// Value reported for the mean and every percentile when no request succeeded.
pub const LATENCY_SENTINEL: f64 = 0.0;

/// Percentile ranks reported for every run.
pub const REPORTED_RANKS: [u8; 4] = [50, 75, 95, 99];

/// Arithmetic mean of `samples`, or [`LATENCY_SENTINEL`] when empty.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return LATENCY_SENTINEL;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Interpolated percentile `rank` (0..=100) of an ascending-sorted sample.
///
/// Returns [`LATENCY_SENTINEL`] for an empty sample. Ranks outside 0..=100
/// are clamped.
pub fn percentile(sorted: &[f64], rank: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return LATENCY_SENTINEL;
    }
    if n == 1 {
        return sorted[0];
    }

    let rank = rank.clamp(0.0, 100.0);
    let position = rank / 100.0 * (n - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }

    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Sorts latencies ascending in place.
///
/// Latencies are finite and non-negative, so `total_cmp` gives the natural order.
pub fn sort_latencies(samples: &mut [f64]) {
    samples.sort_by(f64::total_cmp);
}

/// The fixed set of latency percentiles reported for a run, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Percentiles {
    #[serde(rename = "percentile_50th")]
    pub p50: f64,
    #[serde(rename = "percentile_75th")]
    pub p75: f64,
    #[serde(rename = "percentile_95th")]
    pub p95: f64,
    #[serde(rename = "percentile_99th")]
    pub p99: f64,
}

impl Percentiles {
    /// Computes p50/p75/p95/p99 over an ascending-sorted sample.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            p50: percentile(sorted, 50.0),
            p75: percentile(sorted, 75.0),
            p95: percentile(sorted, 95.0),
            p99: percentile(sorted, 99.0),
        }
    }

    /// Returns the value for one of the [`REPORTED_RANKS`].
    pub fn get(&self, rank: u8) -> Option<f64> {
        match rank {
            50 => Some(self.p50),
            75 => Some(self.p75),
            95 => Some(self.p95),
            99 => Some(self.p99),
            _ => None,
        }
    }

    /// Iterates `(rank, value)` pairs in ascending rank order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        REPORTED_RANKS
            .iter()
            .filter_map(move |&rank| self.get(rank).map(|value| (rank, value)))
    }
}
