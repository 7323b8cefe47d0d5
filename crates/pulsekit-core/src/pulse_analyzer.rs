//! Pulse-length clustering
//!
//! Groups pulses of similar duration and collects statistics per group.
//! Used for protocol tuning and diagnostics: feed it a captured pulse
//! train and read off the duration clusters a protocol is built from.

use crate::error::{ProtocolError, Result};

/// Default relative tolerance for group membership.
pub const DEFAULT_GROUP_TOLERANCE: f64 = 0.1;

/// A group of pulses with similar length, one polarity.
///
/// A group created from a primer holds a fixed center value: primer pulses
/// confirm membership without touching the statistics, and the reported
/// average falls back to the center until a real pulse has been accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseLengthGroup {
    sum: f64,
    count: u32,
    max: f64,
    min: f64,
    is_mark: bool,
    primer_value: Option<f64>,
}

impl PulseLengthGroup {
    fn from_pulse(length_us: f64, is_mark: bool) -> Self {
        Self {
            sum: length_us,
            count: 1,
            max: length_us,
            min: length_us,
            is_mark,
            primer_value: None,
        }
    }

    fn from_primer(length_us: f64, is_mark: bool) -> Self {
        Self {
            sum: 0.0,
            count: 0,
            max: 0.0,
            min: 100_000.0,
            is_mark,
            primer_value: Some(length_us),
        }
    }

    /// The value new pulses are measured against: the fixed primer center
    /// for a primer group, otherwise the running average.
    fn reference(&self) -> f64 {
        match self.primer_value {
            Some(center) => center,
            None => self.sum / f64::from(self.count),
        }
    }

    fn accept(&mut self, length_us: f64, is_mark: bool, is_primer: bool, tolerance: f64) -> bool {
        if is_mark != self.is_mark || (1.0 - length_us / self.reference()).abs() >= tolerance {
            return false;
        }
        // A primer pulse just confirms a primer group's center.
        if !(is_primer && self.primer_value.is_some()) {
            self.sum += length_us;
            self.count += 1;
            self.max = self.max.max(length_us);
            self.min = self.min.min(length_us);
        }
        true
    }

    /// Average pulse length of the group. For a primer group with no real
    /// pulses yet this is the primer center.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            self.primer_value.unwrap_or(f64::NAN)
        } else {
            self.sum / f64::from(self.count)
        }
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

    pub fn is_mark(&self) -> bool {
        self.is_mark
    }
}

/// Clusters pulses by duration and polarity using relative tolerance.
///
/// Each pulse is offered to existing groups in creation order and joins the
/// first that accepts it; otherwise a new single-pulse group is opened.
/// Pulses shorter than 1 µs are noise and ignored.
pub struct PulseLengthAnalyzer {
    groups: Vec<PulseLengthGroup>,
    tolerance: f64,
}

impl Default for PulseLengthAnalyzer {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            tolerance: DEFAULT_GROUP_TOLERANCE,
        }
    }
}

impl PulseLengthAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// An analyzer with a non-default relative tolerance, 0 < tolerance < 1.
    pub fn with_tolerance(tolerance: f64) -> Result<Self> {
        if !(tolerance > 0.0 && tolerance < 1.0) {
            return Err(ProtocolError::InvalidArgument(format!(
                "group tolerance {} outside (0, 1)",
                tolerance
            )));
        }
        Ok(Self {
            groups: Vec::new(),
            tolerance,
        })
    }

    /// Add a pulse to the first matching group, or open a new group for it.
    pub fn add_pulse(&mut self, length_us: f64, is_mark: bool) {
        self.add(length_us, is_mark, false);
    }

    /// Add a primer pulse: a placeholder marking where a group center is
    /// expected to be, anchoring clustering without contributing to the
    /// statistics.
    pub fn add_primer_pulse(&mut self, length_us: f64, is_mark: bool) {
        self.add(length_us, is_mark, true);
    }

    fn add(&mut self, length_us: f64, is_mark: bool, is_primer: bool) {
        if length_us < 1.0 {
            return;
        }
        for group in &mut self.groups {
            if group.accept(length_us, is_mark, is_primer, self.tolerance) {
                return;
            }
        }
        self.groups.push(if is_primer {
            PulseLengthGroup::from_primer(length_us, is_mark)
        } else {
            PulseLengthGroup::from_pulse(length_us, is_mark)
        });
    }

    /// All populated groups, sorted by descending pulse count.
    pub fn pulses(&mut self) -> &[PulseLengthGroup] {
        self.groups.sort_by(|a, b| b.count.cmp(&a.count));
        while self.groups.last().is_some_and(|g| g.count == 0) {
            self.groups.pop();
        }
        &self.groups
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
