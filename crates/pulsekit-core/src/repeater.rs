//! Assembly of repeated transmit pulse trains

use crate::error::Result;
use crate::message::Message;
use crate::protocol::{Phase, ProtocolEncoder};

/// Render a complete transmit pulse train: the encoder's preamble followed
/// by `count` back-to-back repetitions of the message. Encoder errors
/// propagate to the caller.
pub fn repeat(
    encoder: &dyn ProtocolEncoder,
    message: &dyn Message,
    count: u32,
) -> Result<Vec<u32>> {
    let preamble = encoder.encode(message, Phase::First)?;
    let repeated = encoder.encode(message, Phase::Repeated)?;

    let mut train = Vec::with_capacity(preamble.len() + repeated.len() * count as usize);
    train.extend_from_slice(&preamble);
    for _ in 0..count {
        train.extend_from_slice(&repeated);
    }
    Ok(train)
}
