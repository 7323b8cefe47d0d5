//! Raw capture of unknown pulse trains
//!
//! The [`RawDecoder`] is both a pulse decoder and a sample sink. When a
//! plausible pulse train starts it records every raw sample until the
//! message ends, then reports the capture as a [`RawProtocolMessage`] so
//! unknown protocols can be inspected and new decoders developed.

use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::message::RawProtocolMessage;
use crate::protocol::{ProtocolDecoder, ProtocolInfo, SinkRef};
use crate::sampler::ProtocolSampler;

/// Tuning parameters for raw capture and level reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDecoderConfig {
    /// Maximum length of a captured message in milliseconds. Bounds the
    /// sample buffer; capture force-ends when the budget is spent.
    pub max_message_length_ms: u32,
    /// A space of at least this many µs ends the message.
    pub end_of_message_gap_us: f64,
    /// A mark/space start pulse longer than this is not a message start.
    pub max_start_pulse_us: f64,
    /// How many signal level reports are sent per second.
    pub reports_per_second: u32,
    /// Seconds without signal before the reported level decays to zero.
    pub level_time_to_zero_s: u32,
}

impl Default for RawDecoderConfig {
    fn default() -> Self {
        Self {
            max_message_length_ms: 800,
            end_of_message_gap_us: 29_000.0,
            max_start_pulse_us: 200_000.0,
            reports_per_second: 10,
            level_time_to_zero_s: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    ReadingMessage,
}

/// Fallback decoder that captures complete unknown pulse trains.
///
/// Capture starts on a space pulse of plausible length and ends on a long
/// gap or when the sample budget runs out. Independently of capture, every
/// sample updates a decaying peak signal level that is reported to the sink
/// at a fixed cadence. `start_free_sampling` bypasses the edge trigger and
/// records a fixed number of samples unconditionally.
pub struct RawDecoder {
    config: RawDecoderConfig,
    state: State,
    sink: Option<SinkRef>,
    sample_frequency: u32,
    max_message_length: usize,
    sampling: bool,
    free_sampling: bool,
    max_sample_length: usize,
    samples: Vec<i32>,
    sample_count: usize,
    sample_count_at_last_pulse: usize,
    pulse_offsets: Vec<usize>,
    pulse_lengths: Vec<f64>,
    pulse_count: u32,
    level: i32,
    level_report_count: i32,
}

impl RawDecoder {
    pub fn new(config: RawDecoderConfig) -> Result<Self> {
        if config.reports_per_second == 0 || config.level_time_to_zero_s == 0 {
            return Err(ProtocolError::InvalidArgument(format!(
                "level cadence {}/s over {}s must be positive",
                config.reports_per_second, config.level_time_to_zero_s
            )));
        }
        if config.max_message_length_ms == 0 {
            return Err(ProtocolError::InvalidArgument(
                "max message length must be positive".into(),
            ));
        }
        if config.end_of_message_gap_us <= 0.0 || config.max_start_pulse_us <= 0.0 {
            return Err(ProtocolError::InvalidArgument(format!(
                "pulse thresholds {} and {} must be positive",
                config.end_of_message_gap_us, config.max_start_pulse_us
            )));
        }
        Ok(Self::from_config(config))
    }

    fn from_config(config: RawDecoderConfig) -> Self {
        let mut decoder = Self {
            config,
            state: State::Idle,
            sink: None,
            sample_frequency: 0,
            max_message_length: 0,
            sampling: false,
            free_sampling: false,
            max_sample_length: 0,
            samples: Vec::new(),
            sample_count: 0,
            sample_count_at_last_pulse: 0,
            pulse_offsets: Vec::new(),
            pulse_lengths: Vec::new(),
            pulse_count: 0,
            level: 0,
            level_report_count: 10,
        };
        decoder.set_sample_rate(22_000);
        decoder
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_frequency
    }

    /// Start saving raw data for the given number of samples regardless of
    /// whether a pulse train is detected. The collected samples are
    /// reported via the sink as usual.
    pub fn start_free_sampling(&mut self, samples: usize) {
        self.free_sampling = true;
        self.restart_sampler(samples);
    }

    fn restart_sampler(&mut self, samples: usize) {
        self.sample_count = 0;
        self.pulse_offsets = Vec::new();
        self.samples = Vec::with_capacity(samples + 1);
        self.pulse_lengths = Vec::new();
        self.max_sample_length = samples;
    }

    fn calculate_signal_level(&mut self, sample: i32) {
        let magnitude = sample.abs();
        if self.level < magnitude {
            self.level = magnitude;
        }
        self.level_report_count -= 1;
        if self.level_report_count <= 0 {
            if let Some(sink) = &self.sink {
                sink.borrow_mut().report_level(self.level);
            }
            let decay =
                127 / (self.config.reports_per_second * self.config.level_time_to_zero_s) as i32;
            self.level = (self.level - decay).max(0);
            self.level_report_count =
                (self.sample_frequency / self.config.reports_per_second) as i32;
        }
    }

    fn end_message(&mut self, trim_end: bool) {
        // Trim off the trailing idle samples after the last pulse.
        if trim_end && self.samples.len() > self.sample_count_at_last_pulse + 1 {
            self.samples.truncate(self.sample_count_at_last_pulse + 1);
        }
        let message = RawProtocolMessage::new(
            std::mem::take(&mut self.pulse_offsets),
            std::mem::take(&mut self.samples),
            self.sample_frequency,
            std::mem::take(&mut self.pulse_lengths),
        );
        debug!(samples = self.sample_count, "raw capture complete");
        if let Some(sink) = &self.sink {
            sink.borrow_mut().parsed_message(message.into());
        }
        self.sampling = false;
        self.free_sampling = false;
        self.state = State::Idle;
    }
}

impl Default for RawDecoder {
    fn default() -> Self {
        Self::from_config(RawDecoderConfig::default())
    }
}

impl ProtocolSampler for RawDecoder {
    fn add_sample(&mut self, sample: i32) {
        self.calculate_signal_level(sample);
        if self.sampling || self.free_sampling {
            self.samples.push(sample);
            self.sample_count += 1;
            if self.sample_count >= self.max_sample_length {
                self.end_message(!self.free_sampling);
            }
        }
    }

    fn set_sample_rate(&mut self, frequency: u32) {
        self.sample_frequency = frequency;
        self.max_message_length =
            (frequency as usize * self.config.max_message_length_ms as usize) / 1000;
    }
}

impl ProtocolDecoder for RawDecoder {
    fn info(&self) -> ProtocolInfo {
        ProtocolInfo::new("Raw", "Flank Length", "-", 0, 5)
    }

    fn set_target(&mut self, sink: SinkRef) {
        self.sink = Some(sink);
    }

    fn parse(&mut self, pulse_length: f64, is_mark: bool) -> u32 {
        match self.state {
            State::Idle => {
                if pulse_length > 0.0 && pulse_length < self.config.max_start_pulse_us && !is_mark {
                    if !self.free_sampling {
                        self.restart_sampler(self.max_message_length);
                    }
                    self.pulse_count = 1;
                    self.sampling = true;
                    self.pulse_offsets.push(self.sample_count);
                    self.pulse_lengths.push(pulse_length);
                    self.state = State::ReadingMessage;
                }
            }
            State::ReadingMessage => {
                if pulse_length > 0.0
                    && (pulse_length < self.config.end_of_message_gap_us || self.free_sampling)
                {
                    self.pulse_offsets.push(self.sample_count);
                    self.pulse_lengths.push(pulse_length);
                    self.pulse_count += 1;
                } else if self.pulse_count > 1 {
                    // A long space, so we got our message.
                    self.end_message(true);
                }
            }
        }
        self.sample_count_at_last_pulse = self.sample_count;
        match self.state {
            State::Idle => 0,
            State::ReadingMessage => 1,
        }
    }
}
