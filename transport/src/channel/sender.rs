//! Send side: fragmentation and stop-and-wait ARQ.
//!
//! Runs on the same thread as the user-command loop; blocking on this
//! thread's "wait for this fragment's response" never blocks the receive
//! loop, since the receive loop lives on its own thread and only ever
//! forwards ACK/NACK frames into [`AckInbox`].

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::config::Config;
use crate::core::{Frame, MsgType};
use crate::error::Result;
use crate::inbox::Inbox;
use crate::reliable::RetransmitStats;

/// What the receive loop observed in response to an outstanding fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckSignal {
    /// Positive acknowledgment (type 15).
    Ack,
    /// Negative acknowledgment (type 13); resend the same fragment.
    Nack,
}

/// Inbox type used to carry [`AckSignal`]s from the receive loop to the
/// sender.
pub type AckInbox = Inbox<AckSignal>;

/// Fragments and reliably transmits text and file messages.
#[derive(Debug, Default)]
pub struct Sender {
    next_msg_id: u8,
    inject_error: bool,
    stats: RetransmitStats,
}

impl Sender {
    /// Creates a sender with a fresh message-id counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the fault-injection hook for the next outbound fragment.
    pub fn request_error_injection(&mut self) {
        self.inject_error = true;
    }

    /// Cumulative retransmission counters for this sender, for logging.
    pub fn stats(&self) -> RetransmitStats {
        self.stats
    }

    fn next_msg_id(&mut self) -> u8 {
        let id = self.next_msg_id;
        self.next_msg_id = self.next_msg_id.wrapping_add(1);
        id
    }

    /// Sends a complete text message, fragmenting per `config.max_fragment_size`.
    pub fn send_text(
        &mut self,
        socket: &UdpSocket,
        remote: SocketAddr,
        config: &Config,
        ack_inbox: &AckInbox,
        text: &str,
    ) -> Result<()> {
        self.send_fragments(socket, remote, config, ack_inbox, MsgType::TextFragment, text.as_bytes())
    }

    /// Sends a file: a fire-and-forget FILE-NAME frame, then its contents
    /// fragmented exactly like a text message.
    pub fn send_file(
        &mut self,
        socket: &UdpSocket,
        remote: SocketAddr,
        config: &Config,
        ack_inbox: &AckInbox,
        name: &str,
        data: &[u8],
    ) -> Result<()> {
        let msg_id = self.next_msg_id();
        let frame = Frame::new(MsgType::FileName, 0, msg_id, 1, 1, name.as_bytes());
        let mut buf = Vec::new();
        frame.encode(&mut buf, false)?;
        socket.send_to(&buf, remote)?;
        log::debug!("send: FILE-NAME {name:?} (fire-and-forget)");

        self.send_fragments(socket, remote, config, ack_inbox, MsgType::FileFragment, data)
    }

    fn send_fragments(
        &mut self,
        socket: &UdpSocket,
        remote: SocketAddr,
        config: &Config,
        ack_inbox: &AckInbox,
        msg_type: MsgType,
        data: &[u8],
    ) -> Result<()> {
        let max = config.max_fragment_size.max(1);
        let total_fragments = data.len().div_ceil(max).max(1) as u16;
        let msg_id = self.next_msg_id();

        for current_fragment in 1..=total_fragments {
            let start = (current_fragment - 1) as usize * max;
            let end = (start + max).min(data.len());
            let chunk = &data[start..end];

            let mut attempts = 0u32;
            loop {
                let inject = self.inject_error;
                let frame = Frame::new(msg_type, 0, msg_id, total_fragments, current_fragment, chunk);
                let mut buf = Vec::new();
                frame.encode(&mut buf, inject)?;
                socket.send_to(&buf, remote)?;
                self.stats.frames_sent += 1;
                if attempts > 0 {
                    self.stats.retransmissions += 1;
                }
                attempts += 1;
                log::trace!(
                    "send: {msg_type:?} msg_id={msg_id} fragment={current_fragment}/{total_fragments} \
                     bytes={} single_fragment={} inject_error={inject}",
                    frame.wire_size(),
                    frame.is_single_fragment(),
                );

                match ack_inbox.recv_timeout(Duration::from_millis(config.recv_timeout_ms)) {
                    Some(AckSignal::Ack) => break,
                    Some(AckSignal::Nack) => {
                        self.inject_error = false;
                        self.stats.nacks_received += 1;
                        log::debug!("send: NACK for fragment {current_fragment}, resending");
                    }
                    None => {
                        self.stats.timeouts += 1;
                        log::debug!("send: timed out awaiting ACK/NACK, resending fragment {current_fragment}");
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn single_fragment_acked_immediately() {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let loopback = socket.local_addr().unwrap();
        let mut sender = Sender::new();
        let config = Config::default();
        let ack_inbox: AckInbox = Inbox::new();
        ack_inbox.sender().send(AckSignal::Ack).unwrap();

        sender
            .send_text(&socket, loopback, &config, &ack_inbox, "hi")
            .unwrap();
    }

    #[test]
    fn msg_id_wraps_modulo_256() {
        let mut sender = Sender {
            next_msg_id: 255,
            inject_error: false,
            stats: RetransmitStats::default(),
        };
        assert_eq!(sender.next_msg_id(), 255);
        assert_eq!(sender.next_msg_id(), 0);
    }

    #[test]
    fn nack_clears_inject_error_flag() {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let loopback = socket.local_addr().unwrap();
        let mut sender = Sender::new();
        sender.request_error_injection();
        assert!(sender.inject_error);

        let config = Config::default();
        let ack_inbox: AckInbox = Inbox::new();
        ack_inbox.sender().send(AckSignal::Nack).unwrap();
        ack_inbox.sender().send(AckSignal::Ack).unwrap();

        sender
            .send_text(&socket, loopback, &config, &ack_inbox, "x")
            .unwrap();
        assert!(!sender.inject_error);
    }
}
