//! Sample-source contract and sample plumbing
//!
//! Hardware adapters (audio line, radio receiver) push raw amplitude
//! samples through the [`ProtocolSampler`] contract. [`SamplerGroup`] fans
//! one feed out to several consumers, and [`FirFilter`] smooths a noisy
//! feed before it reaches the flank detector.

use std::cell::RefCell;
use std::rc::Rc;

/// Consumer of a raw amplitude sample stream.
///
/// `set_sample_rate` is called before the first sample and again whenever
/// the source changes rate.
pub trait ProtocolSampler {
    /// Process one amplitude sample.
    fn add_sample(&mut self, sample: i32);

    /// The sampling frequency of the stream in Hz.
    fn set_sample_rate(&mut self, frequency: u32);
}

/// Shared handle to a sampler.
pub type SamplerHandle = Rc<RefCell<dyn ProtocolSampler>>;

/// Fans one sample feed out to a group of samplers, in insertion order.
///
/// Used when more than one consumer should see the same data source, for
/// example a flank detector and a raw capture decoder sharing one input.
#[derive(Default)]
pub struct SamplerGroup {
    samplers: Vec<SamplerHandle>,
}

impl SamplerGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sampler: SamplerHandle) {
        self.samplers.push(sampler);
    }

    /// Remove a member, comparing by handle identity. Returns false if the
    /// sampler is not in the group.
    pub fn remove(&mut self, sampler: &SamplerHandle) -> bool {
        let before = self.samplers.len();
        self.samplers.retain(|s| !Rc::ptr_eq(s, sampler));
        self.samplers.len() != before
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }
}

impl ProtocolSampler for SamplerGroup {
    fn add_sample(&mut self, sample: i32) {
        for sampler in &self.samplers {
            sampler.borrow_mut().add_sample(sample);
        }
    }

    fn set_sample_rate(&mut self, frequency: u32) {
        for sampler in &self.samplers {
            sampler.borrow_mut().set_sample_rate(frequency);
        }
    }
}

const FIR_TAPS: usize = 20;
const FIR_DC_GAIN: i64 = 65_536;

/// Low pass FIR filter coefficients: rectangular window, 44 kHz sampling,
/// 6 kHz cut, 16-bit quantization.
const FIR_COEFFICIENTS: [i64; FIR_TAPS] = [
    2182, 1189, -1005, -3140, -3586, -1227, 3810, 10027, 15137, 17110, 15137, 10027, 3810, -1227,
    -3586, -3140, -1005, 1189, 2182, 1650,
];

/// A 20-tap low pass FIR filter chained in front of another sampler.
///
/// Smooths the amplitude stream to suppress high frequency noise before
/// flank detection. Can be switched to pass-through.
pub struct FirFilter {
    history: [i64; FIR_TAPS],
    active: bool,
    output: SamplerHandle,
}

impl FirFilter {
    pub fn new(output: SamplerHandle) -> Self {
        Self {
            history: [0; FIR_TAPS],
            active: true,
            output,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Switch filtering on or off. When off, samples pass through
    /// unmodified.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn filter(&mut self, sample: i32) -> i32 {
        self.history.rotate_right(1);
        self.history[0] = i64::from(sample);
        let accumulated: i64 = FIR_COEFFICIENTS
            .iter()
            .zip(self.history.iter())
            .map(|(coefficient, value)| coefficient * value)
            .sum();
        (accumulated / FIR_DC_GAIN) as i32
    }

    fn output_sample(&mut self, sample: i32) -> i32 {
        if self.active {
            self.filter(sample)
        } else {
            sample
        }
    }
}

impl ProtocolSampler for FirFilter {
    fn add_sample(&mut self, sample: i32) {
        let out = self.output_sample(sample);
        self.output.borrow_mut().add_sample(out);
    }

    fn set_sample_rate(&mut self, frequency: u32) {
        self.output.borrow_mut().set_sample_rate(frequency);
    }
}
