//! Error types for the codecs and the rewrite pipeline.

use thiserror::Error;

/// Envelope decode/encode error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The buffer ended before a declared field was complete.
    #[error("truncated envelope: {field} needs {needed} bytes, {available} available")]
    Truncated {
        /// Field being read.
        field: &'static str,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A text field was not valid UTF-8.
    #[error("envelope field {field} is not valid UTF-8")]
    InvalidText {
        /// Field being read.
        field: &'static str,
    },

    /// A field is too long for its length prefix.
    #[error("envelope field {field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        /// Field being written.
        field: &'static str,
        /// Actual length.
        len: usize,
        /// Largest length the prefix can express.
        max: usize,
    },
}

/// Response framing error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Payload does not fit the 2-byte length field.
    #[error("payload of {len} bytes exceeds frame limit of {max}")]
    PayloadTooLarge {
        /// Payload length.
        len: usize,
        /// Largest encodable length.
        max: usize,
    },

    /// A framed buffer is shorter than its header or declared length.
    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },
}

/// Coordinate validation error.
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    /// Latitude outside [-90, 90] or not finite.
    #[error("latitude {0} must be between -90 and 90")]
    Latitude(f64),

    /// Longitude outside [-180, 180] or not finite.
    #[error("longitude {0} must be between -180 and 180")]
    Longitude(f64),
}

/// Rewrite pipeline error.
///
/// Every variant means the original request should be forwarded unmodified.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The request envelope could not be decoded.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// The positioning payload could not be decoded.
    #[error("payload decode error: {0}")]
    Payload(#[from] prost::DecodeError),

    /// The rewritten payload could not be framed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Result type for rewrite operations.
pub type Result<T> = std::result::Result<T, RewriteError>;
