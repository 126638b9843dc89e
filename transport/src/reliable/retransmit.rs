//! Retransmission bookkeeping for the stop-and-wait send path.
//!
//! There is no exponential backoff and no retry cap here: a fragment is
//! retransmitted on every receive timeout until the peer ACKs, NACKs, or
//! the session's heartbeat supervisor declares the peer dead. There is only
//! ever one fragment outstanding at a time, so a sliding-window backoff
//! strategy has nothing to apply to. The blocking wait on the ACK/NACK inbox
//! (bounded by `Config::recv_timeout_ms`) is itself the retransmission
//! timer; what's tracked here is just the resulting counters.

/// Statistics about retransmission behavior, exposed for logging/diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetransmitStats {
    /// Total fragments sent, including retransmissions.
    pub frames_sent: u64,

    /// Total retransmissions (frames_sent minus one per fragment).
    pub retransmissions: u64,

    /// Total NACKs received.
    pub nacks_received: u64,

    /// Total receive timeouts observed while awaiting an ACK/NACK.
    pub timeouts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_track_retransmissions_and_nacks() {
        let mut stats = RetransmitStats::default();
        stats.frames_sent += 1;
        stats.timeouts += 1;
        stats.retransmissions += 1;
        stats.frames_sent += 1;
        stats.nacks_received += 1;
        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.retransmissions, 1);
        assert_eq!(stats.nacks_received, 1);
        assert_eq!(stats.timeouts, 1);
    }
}
