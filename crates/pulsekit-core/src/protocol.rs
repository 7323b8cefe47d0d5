//! Decoder and encoder contracts
//!
//! Every protocol codec implements these traits. A decoder is a finite state
//! machine fed one pulse per call; an encoder renders a [`Message`] into a
//! pulse-duration train. Decoded results travel through the
//! [`ProtocolDecoderSink`], which is the only result channel.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ProtocolError, Result};
use crate::message::{DecodedMessage, Message};

/// Static description of a protocol codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolInfo {
    name: String,
    encoding_type: String,
    company: String,
    message_length_bits: u32,
    default_repeat_count: u32,
}

impl ProtocolInfo {
    pub fn new(
        name: impl Into<String>,
        encoding_type: impl Into<String>,
        company: impl Into<String>,
        message_length_bits: u32,
        default_repeat_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            encoding_type: encoding_type.into(),
            company: company.into(),
            message_length_bits,
            default_repeat_count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label for the modulation scheme, e.g. "Space Length" or "Mark Length".
    pub fn encoding_type(&self) -> &str {
        &self.encoding_type
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn message_length_bits(&self) -> u32 {
        self.message_length_bits
    }

    /// How many times a message is normally repeated on the air.
    pub fn default_repeat_count(&self) -> u32 {
        self.default_repeat_count
    }
}

/// A named pulse duration with an acceptance window, in microseconds.
///
/// Concrete decoders use these to match incoming pulses against the
/// protocol's nominal timings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseLength {
    length: f64,
    lower_bound: f64,
    upper_bound: f64,
}

impl PulseLength {
    /// A pulse length accepting durations within +/- `tolerance` µs of
    /// `length`.
    pub fn with_tolerance(length: f64, tolerance: f64) -> Result<Self> {
        Self::with_bounds(length, length - tolerance, length + tolerance)
    }

    /// A pulse length with explicit acceptance bounds. The bounds must
    /// bracket the nominal length.
    pub fn with_bounds(length: f64, lower_bound: f64, upper_bound: f64) -> Result<Self> {
        if !(lower_bound <= length && length <= upper_bound) {
            return Err(ProtocolError::InvalidArgument(format!(
                "pulse length {} outside bounds [{}, {}]",
                length, lower_bound, upper_bound
            )));
        }
        Ok(Self {
            length,
            lower_bound,
            upper_bound,
        })
    }

    /// The nominal duration in µs.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// True if the measured duration falls within the acceptance window.
    pub fn matches(&self, pulse_length: f64) -> bool {
        pulse_length >= self.lower_bound && pulse_length <= self.upper_bound
    }
}

/// Receiver of decoding results.
///
/// Implemented by the application layer. Decoders hold a shared handle to
/// the sink and call it as messages complete.
pub trait ProtocolDecoderSink {
    /// A complete message was decoded.
    fn parsed_message(&mut self, message: DecodedMessage);

    /// A message was partially decoded before the signal broke down.
    /// Only reported after at least some bits decoded successfully.
    fn partially_parsed_message(&mut self, protocol: &str, bits: u32);

    /// Periodic report of the current signal level, roughly 0..=127.
    fn report_level(&mut self, level: i32);
}

/// Shared handle to a sink. The core is single threaded, so handles are
/// reference counted without atomics.
pub type SinkRef = Rc<RefCell<dyn ProtocolDecoderSink>>;

/// A pulse protocol decoder.
///
/// The decoder is fed one pulse per `parse` call and advances an internal
/// state machine. `set_target` is always called before the first `parse`.
pub trait ProtocolDecoder {
    /// Description of the protocol this decoder handles.
    fn info(&self) -> ProtocolInfo;

    /// Attach the sink decoded messages are reported to.
    fn set_target(&mut self, sink: SinkRef);

    /// Process one pulse of `pulse_length` µs. `is_mark` gives the pulse
    /// polarity. Returns the decoder's current state code, 0 meaning idle.
    fn parse(&mut self, pulse_length: f64, is_mark: bool) -> u32;
}

/// Shared handle to a decoder.
pub type DecoderHandle = Rc<RefCell<dyn ProtocolDecoder>>;

/// Which part of a repeated transmission an encoder is rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The first transmission, including any preamble.
    First,
    /// Every repetition after the first.
    Repeated,
}

/// A pulse protocol encoder.
pub trait ProtocolEncoder {
    /// Description of the protocol this encoder handles.
    fn info(&self) -> ProtocolInfo;

    /// Render the message as a pulse train for the given phase, as pulse
    /// lengths in µs starting with a mark. A protocol without a preamble
    /// returns an empty sequence for [`Phase::First`]. Fails with
    /// [`ProtocolError::BadMessage`] if the message does not fit the
    /// protocol.
    fn encode(&self, message: &dyn Message, phase: Phase) -> Result<Vec<u32>>;

    /// Carrier modulation frequency in Hz for this message, or 0 when the
    /// signal is unmodulated.
    fn modulation_frequency(&self, message: &dyn Message) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_length_window() {
        let pulse = PulseLength::with_tolerance(550.0, 50.0).unwrap();

        assert_eq!(pulse.length(), 550.0);
        assert!(pulse.matches(500.0));
        assert!(pulse.matches(600.0));
        assert!(!pulse.matches(499.9));
        assert!(!pulse.matches(600.1));
    }

    #[test]
    fn pulse_length_explicit_bounds() {
        let pulse = PulseLength::with_bounds(275.0, 150.0, 450.0).unwrap();

        assert!(pulse.matches(150.0));
        assert!(pulse.matches(450.0));
        assert!(!pulse.matches(100.0));
    }

    #[test]
    fn pulse_length_rejects_bounds_outside_length() {
        assert!(matches!(
            PulseLength::with_bounds(100.0, 150.0, 450.0),
            Err(ProtocolError::InvalidArgument(_))
        ));
        assert!(matches!(
            PulseLength::with_bounds(500.0, 150.0, 450.0),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn protocol_info_fields() {
        let info = ProtocolInfo::new("Nexa", "Space Length", "Nexa", 32, 4);

        assert_eq!(info.name(), "Nexa");
        assert_eq!(info.encoding_type(), "Space Length");
        assert_eq!(info.message_length_bits(), 32);
        assert_eq!(info.default_repeat_count(), 4);
    }
}
