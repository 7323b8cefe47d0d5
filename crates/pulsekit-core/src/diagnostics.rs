//! Per-state pulse statistics for decoder tuning
//!
//! While developing a protocol decoder it helps to see what pulse lengths
//! arrive in each decoder state; the statistics feed directly into the
//! protocol's `PulseLength` acceptance windows.

use std::collections::HashMap;

use tracing::info;

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Pulse length statistics for one decoder state.
#[derive(Debug, Clone, PartialEq)]
pub struct StatePulseStats {
    sum: f64,
    count: u32,
    max: f64,
    min: f64,
}

impl StatePulseStats {
    fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            max: 0.0,
            min: 100_000.0,
        }
    }

    fn accept(&mut self, length_us: f64) {
        self.sum += length_us;
        self.count += 1;
        self.max = self.max.max(length_us);
        self.min = self.min.min(length_us);
    }

    /// Mean pulse length, rounded to 0.1 µs.
    pub fn average(&self) -> f64 {
        round_tenth(self.sum / f64::from(self.count))
    }

    /// Midpoint between the extremes, rounded to 0.1 µs.
    pub fn middle(&self) -> f64 {
        round_tenth((self.max + self.min) / 2.0)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn min(&self) -> f64 {
        self.min
    }
}

/// Collects pulse length statistics keyed by decoder state name.
#[derive(Debug, Default)]
pub struct StatePulseAnalyzer {
    pulses: HashMap<String, StatePulseStats>,
}

impl StatePulseAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one pulse seen in the named state. Pulses shorter than 1 µs
    /// are noise and ignored.
    pub fn add_pulse(&mut self, state: &str, length_us: f64) {
        if length_us < 1.0 {
            return;
        }
        self.pulses
            .entry(state.to_string())
            .or_insert_with(StatePulseStats::new)
            .accept(length_us);
    }

    pub fn pulses(&self) -> &HashMap<String, StatePulseStats> {
        &self.pulses
    }

    /// Log the collected statistics, one line per state.
    pub fn report(&self) {
        for (state, stats) in &self.pulses {
            info!(
                state = %state,
                average = stats.average(),
                middle = stats.middle(),
                max = stats.max,
                min = stats.min,
                count = stats.count,
                "pulse statistics"
            );
        }
    }
}
