//! Tunable parameters for a session.

use crate::core::{FRAME_HEADER_SIZE, MAX_FRAME_SIZE};

/// Default maximum fragment payload size.
const DEFAULT_MAX_FRAGMENT_SIZE: usize = 1490;

/// Default socket receive timeout used while waiting on an ACK/NACK, or
/// during the handshake, in milliseconds.
const DEFAULT_RECV_TIMEOUT_MS: u64 = 3000;

/// Default heartbeat interval for the initiator role, in milliseconds.
const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 2000;

/// Default heartbeat poll window, in milliseconds.
const DEFAULT_HEARTBEAT_POLL_MS: u64 = 1000;

/// Default heartbeat interval for the responder role, in milliseconds.
const DEFAULT_HEARTBEAT_RESPONDER_SLEEP_MS: u64 = 5000;

/// Number of consecutive missed heartbeats before the session is declared dead.
const DEFAULT_MAX_MISSED_HEARTBEATS: u32 = 3;

/// Session-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum payload bytes per fragment.
    pub max_fragment_size: usize,

    /// Receive timeout applied while awaiting a handshake reply or a
    /// fragment's ACK/NACK.
    pub recv_timeout_ms: u64,

    /// Interval between heartbeats sent by the initiator.
    pub heartbeat_interval_ms: u64,

    /// Duration the initiator polls for an inbound heartbeat after sending one.
    pub heartbeat_poll_ms: u64,

    /// Interval between heartbeat checks performed by the responder.
    pub heartbeat_responder_sleep_ms: u64,

    /// Consecutive missed heartbeats tolerated before declaring the peer dead.
    pub max_missed_heartbeats: u32,
}

impl Config {
    /// Creates a configuration with the defaults described in the protocol design.
    pub fn new() -> Self {
        Self {
            max_fragment_size: DEFAULT_MAX_FRAGMENT_SIZE,
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            heartbeat_poll_ms: DEFAULT_HEARTBEAT_POLL_MS,
            heartbeat_responder_sleep_ms: DEFAULT_HEARTBEAT_RESPONDER_SLEEP_MS,
            max_missed_heartbeats: DEFAULT_MAX_MISSED_HEARTBEATS,
        }
    }

    /// Sets the maximum fragment payload size, builder-style.
    ///
    /// Values that would push a frame's total size past [`MAX_FRAME_SIZE`]
    /// are rejected by the caller at the point of use, not here.
    pub fn with_max_fragment_size(mut self, size: usize) -> Self {
        self.max_fragment_size = size;
        self
    }

    /// The largest fragment payload size that still fits under [`MAX_FRAME_SIZE`].
    pub const fn max_allowed_fragment_size() -> usize {
        MAX_FRAME_SIZE - FRAME_HEADER_SIZE
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
