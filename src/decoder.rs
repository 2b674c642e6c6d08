//! Payload decoder: one printer connection's bytes to one text payload.
//!
//! There is no framing. The listener hands over whatever it read before
//! end-of-stream or the read window closed, and the whole buffer is the payload.

use std::borrow::Cow;

/// Why a connection produced no job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The connection carried no bytes.
    Empty,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "no data received"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a raw buffer as UTF-8, replacing invalid sequences with U+FFFD.
pub fn decode(bytes: &[u8]) -> Result<String, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => text.to_owned(),
        Cow::Owned(text) => {
            tracing::debug!(bytes = bytes.len(), "payload contained invalid utf-8, replaced");
            text
        }
    })
}
