//! Flank detection: amplitude samples to mark/space pulses
//!
//! The detector measures rate of change by comparing each sample with a
//! sample a few positions back. When the swing is large enough, in a new
//! direction, and outside the holdoff window, the elapsed time since the
//! previous flank is emitted to the attached decoder as a pulse.

use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::protocol::DecoderHandle;
use crate::sampler::ProtocolSampler;

const HISTORY_DEPTH: usize = 6;

/// Tuning parameters for the flank detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlankDetectorConfig {
    /// Amplitude change needed for a transition to count as a flank.
    pub flank_swing: i32,
    /// Samples to ignore new flanks after an accepted one, so large swings
    /// or ringing are not detected as multiple flanks.
    pub flank_holdoff: u32,
    /// How many samples back the swing is measured over, 1..=5. A slow
    /// signal, for example one smoothed by the FIR filter, needs a higher
    /// value.
    pub flank_length: usize,
    /// Time in µs added to mark pulses and subtracted from space pulses to
    /// compensate for receiver hardware skew.
    pub pulse_width_compensation: i32,
    /// Idle time in seconds before a watchdog push is sent to the decoder.
    pub push_period: f64,
}

impl Default for FlankDetectorConfig {
    fn default() -> Self {
        Self {
            flank_swing: 50,
            flank_holdoff: 5,
            flank_length: 3,
            pulse_width_compensation: 0,
            push_period: 200e-3,
        }
    }
}

/// Finds digital pulses in a stream of analog sample values and feeds them
/// to the attached decoder.
///
/// If no flank arrives for a whole push period, the detector synthesizes a
/// watchdog push: the idle time seen so far as a space pulse followed by a
/// 0 µs mark pulse, so decoders stuck mid-state can detect end of signal on
/// a silent line. The first real pulse after a push is reported as just
/// under the push period, since its true length spanning the synthetic
/// pulses is unknown.
pub struct FlankDetector {
    config: FlankDetectorConfig,
    decoder: DecoderHandle,
    sample_rate: u32,
    history: [i32; HISTORY_DEPTH],
    current_state: bool,
    state_counter: u32,
    push_count: u32,
    has_pushed: bool,
    last_flank_direction: i32,
}

impl FlankDetector {
    pub fn new(decoder: DecoderHandle, config: FlankDetectorConfig) -> Result<Self> {
        if !(1..=5).contains(&config.flank_length) {
            return Err(ProtocolError::InvalidArgument(format!(
                "flank length {} outside 1..=5",
                config.flank_length
            )));
        }
        if config.push_period <= 0.0 {
            return Err(ProtocolError::InvalidArgument(format!(
                "push period {} must be positive",
                config.push_period
            )));
        }
        Ok(Self {
            config,
            decoder,
            sample_rate: 0,
            history: [0; HISTORY_DEPTH],
            current_state: false,
            state_counter: 0,
            // No pushes until the sample rate is known.
            push_count: u32::MAX,
            has_pushed: false,
            last_flank_direction: 0,
        })
    }

    pub fn config(&self) -> &FlankDetectorConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn push_period_us(&self) -> f64 {
        self.config.push_period * 1_000_000.0
    }
}

impl ProtocolSampler for FlankDetector {
    fn add_sample(&mut self, sample: i32) {
        let reference = self.history[self.config.flank_length];
        let mut flank_direction = 0;
        if (reference - sample).abs() > self.config.flank_swing {
            flank_direction = (reference - sample).signum();
        }

        if flank_direction != 0
            && flank_direction != self.last_flank_direction
            && self.state_counter > self.config.flank_holdoff
        {
            // End of the current pulse. If a watchdog push happened since
            // the last real flank the measured length cannot be trusted, so
            // report just under the push period instead.
            let value = if self.has_pushed {
                self.push_period_us() - 1000.0
            } else {
                (f64::from(self.state_counter) / f64::from(self.sample_rate) * 1_000_000.0)
                    .round_ties_even()
            };

            if value > 10_000.0 {
                self.current_state = false;
            }

            let compensation = f64::from(self.config.pulse_width_compensation);
            let adjusted = if self.current_state {
                value + compensation
            } else {
                value - compensation
            };
            self.decoder.borrow_mut().parse(adjusted, self.current_state);

            self.current_state = !self.current_state;
            self.state_counter = 0;
            self.has_pushed = false;
        } else if self.state_counter > self.push_count {
            // Idle for a whole push period. Send the idle time as a space
            // pulse plus a 0 µs mark pulse so stuck state machines can
            // detect end of signal without new real pulses.
            debug!(idle_samples = self.state_counter, "watchdog push");
            self.decoder.borrow_mut().parse(self.push_period_us(), false);
            self.decoder.borrow_mut().parse(0.0, true);
            self.has_pushed = true;
            // Not zero, so a real state swing right after is not missed.
            self.state_counter = self.config.flank_holdoff;
            self.current_state = false;
        }

        self.last_flank_direction = flank_direction;
        self.history.rotate_right(1);
        self.history[0] = sample;
        self.state_counter += 1;
    }

    fn set_sample_rate(&mut self, frequency: u32) {
        self.sample_rate = frequency;
        self.push_count = (f64::from(frequency) * self.config.push_period + 0.5) as u32;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::protocol::{ProtocolDecoder, ProtocolInfo, SinkRef};

    struct RecordingDecoder {
        pulses: Vec<(f64, bool)>,
    }

    impl RecordingDecoder {
        fn new() -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self { pulses: Vec::new() }))
        }
    }

    impl ProtocolDecoder for RecordingDecoder {
        fn info(&self) -> ProtocolInfo {
            ProtocolInfo::new("Recording", "Test", "", 0, 0)
        }

        fn set_target(&mut self, _sink: SinkRef) {}

        fn parse(&mut self, pulse_length: f64, is_mark: bool) -> u32 {
            self.pulses.push((pulse_length, is_mark));
            0
        }
    }

    fn detector_at_10khz(
        holdoff: u32,
    ) -> (FlankDetector, Rc<RefCell<RecordingDecoder>>) {
        let decoder = RecordingDecoder::new();
        let config = FlankDetectorConfig {
            flank_holdoff: holdoff,
            ..FlankDetectorConfig::default()
        };
        let mut detector = FlankDetector::new(decoder.clone(), config).unwrap();
        detector.set_sample_rate(10_000);
        (detector, decoder)
    }

    #[test]
    fn detects_pulse_train_lengths_and_polarities() {
        let (mut detector, decoder) = detector_at_10khz(1);
        let samples = [
            0, 0, 0, 0, 51, 51, 51, 51, 51, 0, 0, 0, 0, 0, 0, 101, 101, 101, 101, 101, 101, 101,
            0, 0, 0, 0,
        ];
        for sample in samples {
            detector.add_sample(sample);
        }

        assert_eq!(
            decoder.borrow().pulses,
            vec![(400.0, false), (500.0, true), (600.0, false), (700.0, true)]
        );
    }

    #[test]
    fn half_microsecond_durations_round_to_even() {
        let decoder = RecordingDecoder::new();
        let config = FlankDetectorConfig {
            flank_holdoff: 1,
            ..FlankDetectorConfig::default()
        };
        let mut detector = FlankDetector::new(decoder.clone(), config).unwrap();
        // At 16 kHz each sample is 62.5 µs, so odd sample counts land on
        // exact .5 µs durations.
        detector.set_sample_rate(16_000);

        for sample in [0, 0, 0, 0, 51, 51, 51, 51, 51, 0, 0, 0, 0] {
            detector.add_sample(sample);
        }

        assert_eq!(decoder.borrow().pulses, vec![(250.0, false), (312.0, true)]);
    }

    #[test]
    fn swing_below_threshold_is_ignored() {
        let (mut detector, decoder) = detector_at_10khz(1);
        for sample in [0, 0, 0, 0, 50, 50, 50, 50, 0, 0, 0, 0] {
            detector.add_sample(sample);
        }
        assert!(decoder.borrow().pulses.is_empty());
    }

    #[test]
    fn idle_line_triggers_watchdog_push() {
        let (mut detector, decoder) = detector_at_10khz(5);
        // push_count = 10000 * 0.2 = 2000 samples
        for _ in 0..2002 {
            detector.add_sample(0);
        }

        assert_eq!(
            decoder.borrow().pulses,
            vec![(200_000.0, false), (0.0, true)]
        );
    }

    #[test]
    fn pulse_after_push_is_clamped_to_push_period() {
        let (mut detector, decoder) = detector_at_10khz(5);
        for _ in 0..2002 {
            detector.add_sample(0);
        }
        decoder.borrow_mut().pulses.clear();

        for sample in [101, 101, 101, 101, 101, 101] {
            detector.add_sample(sample);
        }

        let pulses = decoder.borrow().pulses.clone();
        assert_eq!(pulses, vec![(199_000.0, false)]);
    }

    #[test]
    fn no_push_before_sample_rate_is_set() {
        let decoder = RecordingDecoder::new();
        let mut detector =
            FlankDetector::new(decoder.clone(), FlankDetectorConfig::default()).unwrap();
        for _ in 0..5000 {
            detector.add_sample(0);
        }
        assert!(decoder.borrow().pulses.is_empty());
    }

    #[test]
    fn width_compensation_shifts_marks_and_spaces() {
        let decoder = RecordingDecoder::new();
        let config = FlankDetectorConfig {
            flank_holdoff: 1,
            pulse_width_compensation: 10,
            ..FlankDetectorConfig::default()
        };
        let mut detector = FlankDetector::new(decoder.clone(), config).unwrap();
        detector.set_sample_rate(10_000);

        let samples = [0, 0, 0, 0, 51, 51, 51, 51, 51, 0, 0, 0, 0, 0, 0];
        for sample in samples {
            detector.add_sample(sample);
        }

        // First pulse is a space (compensation subtracted), second a mark.
        assert_eq!(decoder.borrow().pulses, vec![(390.0, false), (510.0, true)]);
    }

    #[test]
    fn rejects_flank_length_out_of_range() {
        let decoder = RecordingDecoder::new();
        let config = FlankDetectorConfig {
            flank_length: 6,
            ..FlankDetectorConfig::default()
        };
        assert!(matches!(
            FlankDetector::new(decoder, config),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }
}
