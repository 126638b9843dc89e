//! Three-way open (SYN / SYN-ACK / ACK) and close (FIN / FIN-ACK / ACK)
//! handshakes.
//!
//! Both run synchronously on the thread that owns them, before that thread's
//! longer-lived role (send/command loop for open; the receive loop itself
//! for close) begins — this is the only point besides the running receive
//! loop where this code calls `recv_from` on the shared socket, which keeps
//! us to exactly one reader of the socket for the whole session.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::config::Config;
use crate::core::{Frame, MsgType, MAX_FRAME_SIZE};
use crate::error::Result;

fn send_control(socket: &UdpSocket, remote: SocketAddr, msg_type: MsgType) -> Result<()> {
    let frame = Frame::control(msg_type, 0);
    let mut buf = Vec::new();
    frame.encode(&mut buf, false)?;
    socket.send_to(&buf, remote)?;
    Ok(())
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// Runs the three-way open handshake to completion. Loops until this peer's
/// ACK has been sent or received — there is no attempt cap, only the
/// caller's patience.
pub fn open(socket: &UdpSocket, remote: SocketAddr, config: &Config) -> Result<()> {
    socket.set_read_timeout(Some(Duration::from_millis(config.recv_timeout_ms)))?;

    let mut syn_received = false;
    send_control(socket, remote, MsgType::Syn)?;
    log::debug!("handshake: sent SYN to {remote}");

    let mut buf = vec![0u8; MAX_FRAME_SIZE];
    loop {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) if from == remote => {
                let frame = match Frame::decode(&buf[..n]) {
                    Ok(frame) => frame,
                    Err(_) => continue,
                };
                match frame.msg_type {
                    MsgType::Syn => {
                        send_control(socket, remote, MsgType::SynAck)?;
                        log::debug!("handshake: received SYN, sent SYN-ACK");
                        syn_received = true;
                    }
                    MsgType::SynAck => {
                        send_control(socket, remote, MsgType::Ack)?;
                        log::info!("handshake: received SYN-ACK, sent ACK, open complete");
                        return Ok(());
                    }
                    MsgType::Ack if syn_received => {
                        log::info!("handshake: received ACK, open complete");
                        return Ok(());
                    }
                    _ => {}
                }
            }
            Ok(_) => {
                // Datagram from an unrelated address; ignore.
            }
            Err(err) if is_timeout(&err) => {
                send_control(socket, remote, MsgType::Syn)?;
                log::debug!("handshake: timed out awaiting reply, resending SYN");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Determines session role from the bound local and remote addresses.
/// `local_port > remote_port` makes this peer the initiator.
pub fn is_initiator(local: SocketAddr, remote: SocketAddr) -> bool {
    local.port() > remote.port()
}

/// Sends FIN and awaits FIN-ACK (with retransmission on timeout), then sends
/// the closing ACK. This is the locally-initiated side of a clean close; it
/// runs on the send/command loop's thread, which is a different thread than
/// the still-running receive loop, so it waits on `close_inbox` — fed by the
/// receive loop's `FinAck` dispatch — rather than calling `recv_from` itself.
pub fn close_locally(
    socket: &UdpSocket,
    remote: SocketAddr,
    config: &Config,
    close_inbox: &crate::inbox::Inbox<()>,
) -> Result<()> {
    send_control(socket, remote, MsgType::Fin)?;
    log::debug!("close: sent FIN to {remote}");

    loop {
        if close_inbox
            .recv_timeout(Duration::from_millis(config.recv_timeout_ms))
            .is_some()
        {
            send_control(socket, remote, MsgType::Ack)?;
            log::info!("close: received FIN-ACK, sent ACK, close complete");
            return Ok(());
        }
        send_control(socket, remote, MsgType::Fin)?;
        log::debug!("close: timed out awaiting FIN-ACK, resending FIN");
    }
}

/// Responds to a peer-initiated FIN: sends FIN-ACK, awaits the closing ACK
/// with retransmission on timeout. Invoked by the receive loop, which is
/// still the only caller of `recv_from` while this runs.
pub fn respond_to_fin(socket: &UdpSocket, remote: SocketAddr, config: &Config) -> Result<()> {
    socket.set_read_timeout(Some(Duration::from_millis(config.recv_timeout_ms)))?;
    send_control(socket, remote, MsgType::FinAck)?;
    log::debug!("close: received FIN, sent FIN-ACK");

    let mut buf = vec![0u8; MAX_FRAME_SIZE];
    loop {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) if from == remote => {
                let frame = match Frame::decode(&buf[..n]) {
                    Ok(frame) => frame,
                    Err(_) => continue,
                };
                if frame.msg_type == MsgType::Ack {
                    log::info!("close: received ACK, close complete");
                    return Ok(());
                }
            }
            Ok(_) => {}
            Err(err) if is_timeout(&err) => {
                send_control(socket, remote, MsgType::FinAck)?;
                log::debug!("close: timed out awaiting ACK, resending FIN-ACK");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn initiator_is_the_higher_port() {
        let a: SocketAddr = (Ipv4Addr::LOCALHOST, 6000).into();
        let b: SocketAddr = (Ipv4Addr::LOCALHOST, 5000).into();
        assert!(is_initiator(a, b));
        assert!(!is_initiator(b, a));
    }

    #[test]
    fn open_handshake_completes_between_two_sockets() {
        let sock_a = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let sock_b = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr_a = sock_a.local_addr().unwrap();
        let addr_b = sock_b.local_addr().unwrap();

        let mut config = Config::default();
        config.recv_timeout_ms = 200;
        let config_b = config.clone();

        let handle = std::thread::spawn(move || open(&sock_b, addr_a, &config_b));
        open(&sock_a, addr_b, &config).unwrap();
        handle.join().unwrap().unwrap();
    }
}
