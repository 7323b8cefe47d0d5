//! Test support for encoder/decoder pairs
//!
//! [`PulseTestPlayer`] is a recording sink, and [`play_pulses`] feeds an
//! encoded pulse train into a decoder the way a transmitter/receiver chain
//! would deliver it. Together they let a codec's tests go message →
//! encoder → pulses → decoder → message without hardware.

use tracing::debug;

use crate::message::{DecodedMessage, Message};
use crate::protocol::{DecoderHandle, ProtocolDecoderSink};

/// How much real transmitter/receiver hardware typically stretches mark
/// pulses and shortens space pulses, in µs.
pub const TYPICAL_WIDTH_DISTORTION_US: i32 = 60;

/// Play an encoded pulse train for a decoder.
///
/// The train is delivered as alternating mark/space pulses starting with a
/// mark, preceded by a 10 000 µs space so the decoder sees a clean idle
/// gap. `width_distortion` is added to mark pulses and subtracted from
/// space pulses, simulating transmitter and receiver hardware skew. Returns
/// false without playing further if a pulse is over 100 000 µs, which no
/// real transmitter would produce.
pub fn play_pulses(decoder: &DecoderHandle, pulses: &[u32], width_distortion: i32) -> bool {
    let mut is_mark = true;
    decoder.borrow_mut().parse(10_000.0, false);
    for &pulse in pulses {
        if pulse > 100_000 {
            return false;
        }
        let distortion = f64::from(width_distortion);
        let adjusted = if is_mark {
            f64::from(pulse) + distortion
        } else {
            f64::from(pulse) - distortion
        };
        decoder.borrow_mut().parse(adjusted, is_mark);
        is_mark = !is_mark;
    }
    true
}

/// A sink that records everything a decoder reports, for assertions in
/// codec tests.
#[derive(Default)]
pub struct PulseTestPlayer {
    messages: Vec<DecodedMessage>,
    partially_parsed: u32,
    reported_level: i32,
}

impl PulseTestPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[DecodedMessage] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Number of partial-parse reports received.
    pub fn partially_parsed(&self) -> u32 {
        self.partially_parsed
    }

    /// The most recently reported signal level.
    pub fn reported_level(&self) -> i32 {
        self.reported_level
    }

    /// Integer value of the named field of message `index`, or -1 when the
    /// message or field does not exist.
    pub fn message_field(&self, index: usize, name: &str) -> i32 {
        self.messages
            .get(index)
            .and_then(|m| m.field(name))
            .map(|f| f.value())
            .unwrap_or(-1)
    }

    /// String value of the named field of message `index`, or empty when
    /// the message or field does not exist.
    pub fn message_field_string(&self, index: usize, name: &str) -> String {
        self.messages
            .get(index)
            .and_then(|m| m.field(name))
            .map(|f| f.string_value())
            .unwrap_or_default()
    }
}

impl ProtocolDecoderSink for PulseTestPlayer {
    fn parsed_message(&mut self, message: DecodedMessage) {
        self.messages.push(message);
    }

    fn partially_parsed_message(&mut self, protocol: &str, bits: u32) {
        self.partially_parsed += 1;
        debug!(protocol, bits, "partially parsed");
    }

    fn report_level(&mut self, level: i32) {
        self.reported_level = level;
    }
}
