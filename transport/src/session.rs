//! Session orchestration: owns the shared socket and state, and hosts the
//! three cooperating activities described in the concurrency model — the
//! receive loop, the send/command loop, and the heartbeat supervisor.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::channel::{AckInbox, Outcome, ReceivePath, Sender as SendPath};
use crate::config::Config;
use crate::error::Result;
use crate::handshake;
use crate::heartbeat;
use crate::inbox::Inbox;
use crate::sink::{ApplicationSink, Command, CommandSource};

/// An open session: a bound local socket, a known remote peer, and the role
/// this side plays in the heartbeat protocol.
pub struct Session {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    config: Config,
    is_initiator: bool,
    end_connection: Arc<AtomicBool>,
}

/// Background activities spawned by [`Session::spawn`]. Dropping this without
/// calling [`SessionActivities::join`] leaves the threads running detached.
pub struct SessionActivities {
    receive_handle: JoinHandle<()>,
    heartbeat_handle: JoinHandle<()>,
}

impl SessionActivities {
    /// Waits for both background activities to finish (normally once
    /// `end_connection` has been set).
    pub fn join(self) {
        let _ = self.receive_handle.join();
        let _ = self.heartbeat_handle.join();
    }
}

impl Session {
    /// Binds `local`, performs the three-way open handshake with `remote`,
    /// and determines this side's heartbeat role. This runs entirely on the
    /// calling thread, before any background activity exists — the
    /// invariant that only one activity ever calls `recv_from` holds
    /// trivially here because it is the only activity.
    pub fn connect(local: SocketAddr, remote: SocketAddr, config: Config) -> Result<Self> {
        let socket = UdpSocket::bind(local)?;
        handshake::open(&socket, remote, &config)?;
        let is_initiator = handshake::is_initiator(socket.local_addr()?, remote);
        log::info!(
            "session: open with {remote} complete, role={}",
            if is_initiator { "initiator" } else { "responder" }
        );

        Ok(Self {
            socket: Arc::new(socket),
            remote,
            config,
            is_initiator,
            end_connection: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Spawns the receive loop and heartbeat supervisor as background
    /// threads, and returns a [`SessionHandle`] for running the send/command
    /// loop on the calling thread.
    pub fn spawn(&self, sink: Box<dyn ApplicationSink>) -> (SessionHandle, SessionActivities) {
        let ack_inbox: AckInbox = Inbox::new();
        let heartbeat_inbox: Inbox<()> = Inbox::new();
        let close_inbox: Inbox<()> = Inbox::new();

        let ack_tx = ack_inbox.sender();
        let heartbeat_tx = heartbeat_inbox.sender();
        let close_tx = close_inbox.sender();

        let receive_handle = {
            let socket = Arc::clone(&self.socket);
            let remote = self.remote;
            let config = self.config.clone();
            let end_connection = Arc::clone(&self.end_connection);
            std::thread::spawn(move || {
                run_receive_loop(
                    socket,
                    remote,
                    config,
                    heartbeat_tx,
                    ack_tx,
                    close_tx,
                    end_connection,
                    sink,
                );
            })
        };

        let heartbeat_handle = {
            let socket = Arc::clone(&self.socket);
            let remote = self.remote;
            let config = self.config.clone();
            let is_initiator = self.is_initiator;
            let end_connection = Arc::clone(&self.end_connection);
            std::thread::spawn(move || {
                heartbeat::run(
                    &socket,
                    remote,
                    &config,
                    is_initiator,
                    &heartbeat_inbox,
                    &end_connection,
                );
            })
        };

        let handle = SessionHandle {
            socket: Arc::clone(&self.socket),
            remote: self.remote,
            config: self.config.clone(),
            end_connection: Arc::clone(&self.end_connection),
            ack_inbox,
            close_inbox,
            send_path: SendPath::new(),
        };

        (
            handle,
            SessionActivities {
                receive_handle,
                heartbeat_handle,
            },
        )
    }

    /// True if this side is the heartbeat-initiating role (`local_port >
    /// remote_port`).
    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }
}

/// Everything the send/command loop needs; owned and driven on the calling
/// thread (ordinarily the process's main thread).
pub struct SessionHandle {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    config: Config,
    end_connection: Arc<AtomicBool>,
    ack_inbox: AckInbox,
    close_inbox: Inbox<()>,
    send_path: SendPath,
}

impl SessionHandle {
    /// Runs the command loop until the source is exhausted or a command
    /// ends the session. Returns once `end_connection` is set.
    pub fn run_command_loop(&mut self, commands: &mut dyn CommandSource) -> Result<()> {
        while !self.end_connection.load(Ordering::Relaxed) {
            let Some(command) = commands.next_command() else {
                break;
            };

            match command {
                Command::Help => {
                    print_help();
                }
                Command::SendText(text) => {
                    self.send_path.send_text(
                        &self.socket,
                        self.remote,
                        &self.config,
                        &self.ack_inbox,
                        &text,
                    )?;
                }
                Command::SendFile { name, data } => {
                    self.send_path.send_file(
                        &self.socket,
                        self.remote,
                        &self.config,
                        &self.ack_inbox,
                        &name,
                        &data,
                    )?;
                }
                Command::SetMaxFragmentSize(size) => {
                    if size >= Config::max_allowed_fragment_size() {
                        log::warn!(
                            "command: requested fragment size {size} exceeds the limit of {}, ignoring",
                            Config::max_allowed_fragment_size()
                        );
                    } else {
                        self.config.max_fragment_size = size;
                    }
                }
                Command::InjectError => {
                    self.send_path.request_error_injection();
                }
                Command::End => {
                    self.end_abruptly();
                    break;
                }
                Command::EndClean => {
                    self.close_clean()?;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Sends an unacknowledged END and marks the session over locally.
    pub fn end_abruptly(&self) {
        use crate::core::{Frame, MsgType};
        let frame = Frame::control(MsgType::End, 0);
        let mut buf = Vec::new();
        if frame.encode(&mut buf, false).is_ok() {
            let _ = self.socket.send_to(&buf, self.remote);
        }
        log::info!("command: abrupt local close, {:?}", self.send_path.stats());
        self.end_connection.store(true, Ordering::Relaxed);
    }

    /// Runs the three-way clean close (FIN / FIN-ACK / ACK) and marks the
    /// session over once it completes.
    pub fn close_clean(&self) -> Result<()> {
        handshake::close_locally(&self.socket, self.remote, &self.config, &self.close_inbox)?;
        log::info!("command: clean close, {:?}", self.send_path.stats());
        self.end_connection.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Shared flag other activities watch to know the session has ended.
    pub fn end_connection_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.end_connection)
    }
}

fn print_help() {
    println!("Commands:");
    println!("  <text>           send a text message");
    println!("  /file <path>     send a file");
    println!("  /max <n>         set the maximum fragment size");
    println!("  /save <dir>      set the directory received files are written to");
    println!("  /error           corrupt the next outbound fragment (test hook)");
    println!("  /end             abrupt local close");
    println!("  /end fr          clean close (FIN/FIN-ACK/ACK)");
    println!("  /help            show this message");
}

#[allow(clippy::too_many_arguments)]
fn run_receive_loop(
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    config: Config,
    heartbeat_tx: std::sync::mpsc::Sender<()>,
    ack_tx: std::sync::mpsc::Sender<crate::channel::AckSignal>,
    close_tx: std::sync::mpsc::Sender<()>,
    end_connection: Arc<AtomicBool>,
    mut sink: Box<dyn ApplicationSink>,
) {
    if let Err(err) = socket.set_read_timeout(Some(Duration::from_millis(config.recv_timeout_ms)))
    {
        log::error!("recv: failed to set read timeout: {err}");
        return;
    }

    let mut path = ReceivePath::new();
    let mut buf = vec![0u8; crate::core::MAX_FRAME_SIZE];

    while !end_connection.load(Ordering::Relaxed) {
        let (n, from) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue;
            }
            Err(err) => {
                log::error!("recv: socket error: {err}");
                break;
            }
        };

        if from != remote {
            continue;
        }

        let outcome = match path.dispatch(&socket, remote, &buf[..n], &heartbeat_tx, &ack_tx, &close_tx, sink.as_mut()) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("recv: error dispatching frame: {err}");
                continue;
            }
        };

        match outcome {
            Outcome::Continue => {}
            Outcome::PeerInitiatedFin => {
                if let Err(err) = handshake::respond_to_fin(&socket, remote, &config) {
                    log::warn!("recv: close handshake failed: {err}");
                }
                end_connection.store(true, Ordering::Relaxed);
                sink.on_closed("peer closed the session");
                return;
            }
            Outcome::PeerInitiatedEnd => {
                end_connection.store(true, Ordering::Relaxed);
                sink.on_closed("peer ended the session abruptly");
                return;
            }
        }
    }

    sink.on_closed("session ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        texts: Arc<Mutex<Vec<String>>>,
    }

    impl ApplicationSink for RecordingSink {
        fn on_text(&mut self, text: String) {
            self.texts.lock().unwrap().push(text);
        }
        fn on_file(&mut self, _name: String, _data: Vec<u8>) {}
        fn on_closed(&mut self, _reason: &str) {}
    }

    struct OnceCommands(Vec<Command>);
    impl CommandSource for OnceCommands {
        fn next_command(&mut self) -> Option<Command> {
            if self.0.is_empty() {
                None
            } else {
                Some(self.0.remove(0))
            }
        }
    }

    #[test]
    fn connect_assigns_deterministic_roles() {
        let local_a = (Ipv4Addr::LOCALHOST, 0);
        let local_b = (Ipv4Addr::LOCALHOST, 0);

        let socket_a = UdpSocket::bind(local_a).unwrap();
        let socket_b = UdpSocket::bind(local_b).unwrap();
        let addr_a = socket_a.local_addr().unwrap();
        let addr_b = socket_b.local_addr().unwrap();
        drop(socket_a);
        drop(socket_b);

        let mut config = Config::default();
        config.recv_timeout_ms = 100;
        let config_b = config.clone();

        let handle = std::thread::spawn(move || Session::connect(addr_b, addr_a, config_b));
        let session_a = Session::connect(addr_a, addr_b, config).unwrap();
        let session_b = handle.join().unwrap().unwrap();

        assert_ne!(session_a.is_initiator(), session_b.is_initiator());
        assert_eq!(session_a.is_initiator(), addr_a.port() > addr_b.port());
    }

    #[test]
    fn end_to_end_text_delivery() {
        let socket_a = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let socket_b = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr_a = socket_a.local_addr().unwrap();
        let addr_b = socket_b.local_addr().unwrap();
        drop(socket_a);
        drop(socket_b);

        let mut config = Config::default();
        config.recv_timeout_ms = 100;
        config.heartbeat_interval_ms = 50;
        config.heartbeat_poll_ms = 20;
        config.heartbeat_responder_sleep_ms = 30;
        let config_b = config.clone();

        let handle_b = std::thread::spawn(move || Session::connect(addr_b, addr_a, config_b));
        let session_a = Session::connect(addr_a, addr_b, config).unwrap();
        let session_b = handle_b.join().unwrap().unwrap();

        let texts_b = Arc::new(Mutex::new(Vec::new()));
        let sink_b = RecordingSink {
            texts: Arc::clone(&texts_b),
        };
        let (mut handle_a, activities_a) = session_a.spawn(Box::new(RecordingSink::default()));
        let (_handle_b, activities_b) = session_b.spawn(Box::new(sink_b));

        let mut commands = OnceCommands(vec![
            Command::SendText("hello".to_string()),
            Command::End,
        ]);
        handle_a.run_command_loop(&mut commands).unwrap();

        activities_a.join();
        activities_b.join();

        assert_eq!(texts_b.lock().unwrap().as_slice(), ["hello".to_string()]);
    }
}
