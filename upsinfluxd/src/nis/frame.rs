//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Framing used by the apcupsd NIS protocol.
//!
//! Every message in either direction is a 2-byte big-endian length followed
//! by that many bytes of payload. A zero length marks the end of a response.
use thiserror::Error;

/// Size of the length prefix in front of every frame.
pub const LENGTH_PREFIX_SIZE: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),
    #[error("Length prefix needs 2 bytes, got {0}")]
    ShortPrefix(usize),
}

/// Prefixes `payload` with its length.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len =
        u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge(payload.len()))?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Parses the length prefix found at the start of `bytes`.
pub fn decode_length_prefix(bytes: &[u8]) -> Result<u16, FrameError> {
    match bytes {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(FrameError::ShortPrefix(bytes.len())),
    }
}
