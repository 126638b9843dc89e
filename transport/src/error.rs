//! Error types for the transport protocol.
//!
//! This module defines all possible errors that can occur during
//! session setup, frame codec operations, and data transfer.

use std::fmt;

/// Result type alias for transport operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for the transport protocol.
#[derive(Debug)]
pub enum Error {
    /// A header field was out of the range the wire format allows.
    InvalidField(&'static str),

    /// A datagram was shorter than the fixed header size.
    ShortFrame,

    /// The high nibble of the first header byte is not a recognized message type.
    MalformedHeader,

    /// Checksum verification failed.
    ChecksumMismatch,

    /// The header's declared length did not match the actual payload length.
    LengthMismatch,

    /// A data frame repeated the last accepted message id.
    DuplicateFrame,

    /// No ACK/NACK arrived for an outstanding fragment within the timeout.
    AckTimeout,

    /// The heartbeat supervisor observed too many consecutive missed beats.
    HeartbeatLost,

    /// The peer closed the session.
    PeerClosed,

    /// The handshake did not complete.
    HandshakeFailed,

    /// Resource temporarily unavailable (would block).
    WouldBlock,

    /// Transport I/O error occurred.
    Io(std::io::Error),
}

impl Error {
    /// Returns a human-readable description of the error.
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::InvalidField(_) => "invalid field",
            Error::ShortFrame => "datagram shorter than the frame header",
            Error::MalformedHeader => "unrecognized message type in header",
            Error::ChecksumMismatch => "checksum mismatch",
            Error::LengthMismatch => "declared length does not match payload length",
            Error::DuplicateFrame => "duplicate message id",
            Error::AckTimeout => "timed out waiting for ACK/NACK",
            Error::HeartbeatLost => "peer missed too many heartbeats",
            Error::PeerClosed => "peer closed the session",
            Error::HandshakeFailed => "handshake did not complete",
            Error::WouldBlock => "would block",
            Error::Io(_) => "I/O error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidField(field) => write!(f, "invalid field: {field}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Error::WouldBlock,
            _ => Error::Io(err),
        }
    }
}
