//! Decoded message model
//!
//! Messages for simple IR/RF pulse protocols are flat lists of named field
//! values plus a little protocol-level bookkeeping. Decoders produce
//! [`ProtocolMessage`]s (or, for unknown signals, [`RawProtocolMessage`]s
//! carrying the captured signal itself) and hand them to the sink; encoders
//! consume anything implementing [`Message`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// The value carried by a message field: an integer or a text string,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldData {
    Integer(i32),
    Text(String),
}

/// A single named field of a protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldValue {
    name: String,
    data: FieldData,
}

impl FieldValue {
    /// Create an integer field.
    pub fn integer(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            data: FieldData::Integer(value),
        }
    }

    /// Create a text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: FieldData::Text(value.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, FieldData::Text(_))
    }

    /// Integer value of the field. For a text field this is a best-effort
    /// numeric interpretation, or -1 if the text is not numeric.
    pub fn value(&self) -> i32 {
        match &self.data {
            FieldData::Integer(value) => *value,
            FieldData::Text(text) => text.parse().unwrap_or(-1),
        }
    }

    /// String value of the field. Integer fields are formatted as decimal.
    pub fn string_value(&self) -> String {
        match &self.data {
            FieldData::Integer(value) => value.to_string(),
            FieldData::Text(text) => text.clone(),
        }
    }
}

/// A message of named field values, unencoded, for simple IR/RF protocols.
///
/// This is the container for decoded messages and for messages intended for
/// encoding. Which fields are available depends on the protocol and is
/// determined by the encoders and decoders.
pub trait Message {
    /// The fields of the message, in insertion order.
    fn fields(&self) -> &[FieldValue];

    /// Find the first field with the given name.
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields().iter().find(|f| f.name() == name)
    }
}

/// A decoded message from a known pulse protocol.
///
/// Besides the field values this carries the protocol name, a fixed-length
/// raw byte rendering of the message, the command and address the message
/// represents, a repetition count, and an optional human readable
/// interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    protocol: String,
    raw: Vec<u8>,
    fields: Vec<FieldValue>,
    interpretation: String,
    command: i32,
    address: i32,
    repeat: u32,
}

impl ProtocolMessage {
    /// Create a message with an all-zero raw rendering of `raw_length`
    /// bytes. The raw length is fixed for the lifetime of the message.
    pub fn new(protocol: impl Into<String>, command: i32, address: i32, raw_length: usize) -> Self {
        Self::with_raw(protocol, command, address, vec![0; raw_length])
    }

    /// Create a message with the given raw byte rendering.
    pub fn with_raw(protocol: impl Into<String>, command: i32, address: i32, raw: Vec<u8>) -> Self {
        Self {
            protocol: protocol.into(),
            raw,
            fields: Vec::new(),
            interpretation: String::new(),
            command,
            address,
            repeat: 0,
        }
    }

    /// Name of the protocol this message belongs to.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) {
        self.protocol = protocol.into();
    }

    /// The binary rendering of the message.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Set one byte of the raw rendering. The length is fixed at creation,
    /// so the index must be within it.
    pub fn set_raw_byte(&mut self, index: usize, value: u8) -> Result<()> {
        let len = self.raw.len();
        match self.raw.get_mut(index) {
            Some(byte) => {
                *byte = value;
                Ok(())
            }
            None => Err(ProtocolError::InvalidArgument(format!(
                "raw byte index {} outside message of {} bytes",
                index, len
            ))),
        }
    }

    /// Append a field to the message.
    pub fn add_field(&mut self, field: FieldValue) {
        self.fields.push(field);
    }

    /// Integer representation of the command this message carries.
    pub fn command(&self) -> i32 {
        self.command
    }

    pub fn set_command(&mut self, command: i32) {
        self.command = command;
    }

    /// Integer representation of the destination address or resource.
    pub fn address(&self) -> i32 {
        self.address
    }

    pub fn set_address(&mut self, address: i32) {
        self.address = address;
    }

    /// Number of repetitions of this message received so far, when the
    /// message is part of a repeated train.
    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: u32) {
        self.repeat = repeat;
    }

    /// A name for the command, when the protocol knows one.
    pub fn interpretation(&self) -> &str {
        &self.interpretation
    }

    pub fn set_interpretation(&mut self, interpretation: impl Into<String>) {
        self.interpretation = interpretation.into();
    }
}

impl Message for ProtocolMessage {
    fn fields(&self) -> &[FieldValue] {
        &self.fields
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Command={:x} Address={:x}",
            self.protocol, self.command, self.address
        )
    }
}

/// A captured message from an unknown pulse protocol.
///
/// Produced only by the raw capture decoder. Carries the sample offsets of
/// the detected pulse edges, the raw amplitude samples, the sampling
/// frequency, and the measured pulse lengths, so that the signal can be
/// presented for analysis. Read-only once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProtocolMessage {
    message: ProtocolMessage,
    pulse_offsets: Vec<usize>,
    samples: Vec<i32>,
    sample_rate: u32,
    pulse_lengths: Vec<f64>,
}

impl RawProtocolMessage {
    pub fn new(
        pulse_offsets: Vec<usize>,
        samples: Vec<i32>,
        sample_rate: u32,
        pulse_lengths: Vec<f64>,
    ) -> Self {
        let message = ProtocolMessage::new("Raw", pulse_offsets.len() as i32, 0, 1);
        Self {
            message,
            pulse_offsets,
            samples,
            sample_rate,
            pulse_lengths,
        }
    }

    /// The protocol-message header ("Raw", command = number of pulses).
    pub fn protocol_message(&self) -> &ProtocolMessage {
        &self.message
    }

    /// Sample offset of each detected pulse edge.
    pub fn pulse_offsets(&self) -> &[usize] {
        &self.pulse_offsets
    }

    /// The raw amplitude samples covering the message.
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    /// Sampling frequency of the capture in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Measured pulse lengths in microseconds.
    pub fn pulse_lengths(&self) -> &[f64] {
        &self.pulse_lengths
    }
}

impl Message for RawProtocolMessage {
    fn fields(&self) -> &[FieldValue] {
        self.message.fields()
    }
}

impl fmt::Display for RawProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Raw:")?;
        for offset in &self.pulse_offsets {
            write!(f, " {},", (offset / 100) * 100)?;
        }
        Ok(())
    }
}

/// A decoded message as delivered to the sink: either a message from a
/// known protocol or a raw capture of an unknown one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecodedMessage {
    Protocol(ProtocolMessage),
    Raw(RawProtocolMessage),
}

impl DecodedMessage {
    /// The protocol-message view of the decoded message.
    pub fn protocol_message(&self) -> &ProtocolMessage {
        match self {
            DecodedMessage::Protocol(message) => message,
            DecodedMessage::Raw(raw) => raw.protocol_message(),
        }
    }

    pub fn as_raw(&self) -> Option<&RawProtocolMessage> {
        match self {
            DecodedMessage::Raw(raw) => Some(raw),
            DecodedMessage::Protocol(_) => None,
        }
    }
}

impl From<ProtocolMessage> for DecodedMessage {
    fn from(message: ProtocolMessage) -> Self {
        DecodedMessage::Protocol(message)
    }
}

impl From<RawProtocolMessage> for DecodedMessage {
    fn from(message: RawProtocolMessage) -> Self {
        DecodedMessage::Raw(message)
    }
}

impl Message for DecodedMessage {
    fn fields(&self) -> &[FieldValue] {
        match self {
            DecodedMessage::Protocol(message) => message.fields(),
            DecodedMessage::Raw(raw) => raw.fields(),
        }
    }
}

impl fmt::Display for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedMessage::Protocol(message) => message.fmt(f),
            DecodedMessage::Raw(raw) => raw.fmt(f),
        }
    }
}
