//! # PulseKit Core
//!
//! Pulse-length protocol processing for RF/IR remote control and sensor
//! signals: turn an analog sample stream into mark/space pulses, feed them
//! through pluggable per-protocol decoders, and assemble messages back into
//! transmit pulse trains.
//!
//! ## Signal Flow
//!
//! ```text
//! RX: samples → FlankDetector → pulses → DecoderGroup / RawDecoder → sink
//! TX: Message → ProtocolEncoder → repeater::repeat → pulse train
//! ```
//!
//! Concrete protocol codecs implement the [`ProtocolDecoder`] and
//! [`ProtocolEncoder`] traits, packing and unpacking their payload bits
//! with [`BitString`]. Unknown signals fall through to the [`RawDecoder`],
//! which captures the raw pulse train for analysis with
//! [`PulseLengthAnalyzer`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use pulsekit_core::{
//!     FlankDetector, FlankDetectorConfig, ProtocolDecoder, ProtocolSampler, PulseTestPlayer,
//!     RawDecoder,
//! };
//!
//! // An unknown-signal capture chain: samples in, raw messages out.
//! let sink = Rc::new(RefCell::new(PulseTestPlayer::new()));
//! let raw = Rc::new(RefCell::new(RawDecoder::default()));
//! raw.borrow_mut().set_target(sink.clone());
//!
//! let mut detector =
//!     FlankDetector::new(raw.clone(), FlankDetectorConfig::default()).unwrap();
//! detector.set_sample_rate(22_000);
//! for sample in [0i32; 1024] {
//!     detector.add_sample(sample);
//! }
//! ```

pub mod bits;
pub mod decoder_group;
pub mod diagnostics;
pub mod error;
pub mod flank;
pub mod message;
pub mod player;
pub mod protocol;
pub mod pulse_analyzer;
pub mod raw_decoder;
pub mod repeater;
pub mod sampler;

pub use bits::{BitString, Field};
pub use decoder_group::DecoderGroup;
pub use diagnostics::StatePulseAnalyzer;
pub use error::{ProtocolError, Result};
pub use flank::{FlankDetector, FlankDetectorConfig};
pub use message::{DecodedMessage, FieldValue, Message, ProtocolMessage, RawProtocolMessage};
pub use player::{play_pulses, PulseTestPlayer};
pub use protocol::{
    DecoderHandle, Phase, ProtocolDecoder, ProtocolDecoderSink, ProtocolEncoder, ProtocolInfo,
    PulseLength, SinkRef,
};
pub use pulse_analyzer::{PulseLengthAnalyzer, PulseLengthGroup};
pub use raw_decoder::{RawDecoder, RawDecoderConfig};
pub use sampler::{FirFilter, ProtocolSampler, SamplerGroup, SamplerHandle};
