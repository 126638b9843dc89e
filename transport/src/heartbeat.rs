//! Bidirectional heartbeat liveness supervisor.
//!
//! Runs as its own activity for the lifetime of the session. It never calls
//! `recv_from` itself — it only polls the inbox the receive loop feeds
//! whenever a HEARTBEAT frame (type 5) arrives.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::core::{Frame, MsgType};
use crate::inbox::Inbox;

fn send_heartbeat(socket: &UdpSocket, remote: SocketAddr) {
    let frame = Frame::control(MsgType::Heartbeat, 0);
    let mut buf = Vec::new();
    if frame.encode(&mut buf, false).is_ok() {
        if let Err(err) = socket.send_to(&buf, remote) {
            log::warn!("heartbeat: failed to send to {remote}: {err}");
        }
    }
}

/// Runs the initiator's half of the liveness protocol: send a heartbeat,
/// then listen for the peer's reply for a while before deciding whether it
/// was missed.
fn run_initiator(
    socket: &UdpSocket,
    remote: SocketAddr,
    config: &Config,
    inbox: &Inbox<()>,
    end_connection: &AtomicBool,
) {
    let mut missed = 0u32;
    while !end_connection.load(Ordering::Relaxed) {
        send_heartbeat(socket, remote);
        log::trace!("heartbeat: sent probe (missed={missed})");

        if inbox
            .recv_timeout(Duration::from_millis(config.heartbeat_poll_ms))
            .is_some()
        {
            missed = 0;
        } else {
            missed += 1;
            log::debug!("heartbeat: missed {missed}/{}", config.max_missed_heartbeats);
        }

        if missed >= config.max_missed_heartbeats {
            log::warn!("heartbeat: peer unresponsive, declaring session dead");
            end_connection.store(true, Ordering::Relaxed);
            return;
        }

        std::thread::sleep(Duration::from_millis(
            config
                .heartbeat_interval_ms
                .saturating_sub(config.heartbeat_poll_ms),
        ));
    }
}

/// Runs the responder's half: sleep, then check whether a heartbeat arrived
/// and reply in kind.
fn run_responder(
    socket: &UdpSocket,
    remote: SocketAddr,
    config: &Config,
    inbox: &Inbox<()>,
    end_connection: &AtomicBool,
) {
    let mut missed = 0u32;
    while !end_connection.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(config.heartbeat_responder_sleep_ms));

        if inbox.try_recv().is_some() {
            missed = 0;
            send_heartbeat(socket, remote);
            log::trace!("heartbeat: replied to probe");
        } else {
            missed += 1;
            log::debug!("heartbeat: missed {missed}/{}", config.max_missed_heartbeats);
        }

        if missed >= config.max_missed_heartbeats {
            log::warn!("heartbeat: peer unresponsive, declaring session dead");
            end_connection.store(true, Ordering::Relaxed);
            return;
        }
    }
}

/// Runs the heartbeat supervisor loop for the given role until
/// `end_connection` is set.
pub fn run(
    socket: &UdpSocket,
    remote: SocketAddr,
    config: &Config,
    is_initiator: bool,
    inbox: &Inbox<()>,
    end_connection: &AtomicBool,
) {
    if is_initiator {
        run_initiator(socket, remote, config, inbox, end_connection);
    } else {
        run_responder(socket, remote, config, inbox, end_connection);
    }
}
