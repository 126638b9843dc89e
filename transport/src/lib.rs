//! Reliable message-and-file transport over UDP.
//!
//! A session layer providing a fixed 10-byte framed wire format,
//! CRC-16/XMODEM integrity checking, a three-way open/close handshake,
//! fragmentation with stop-and-wait ARQ, and a bidirectional heartbeat
//! liveness supervisor. The interactive command-line front end, the
//! file-system read/write adapter, and logging configuration are left to
//! consumers of this crate (see [`sink::ApplicationSink`] and
//! [`sink::CommandSource`]).

pub mod channel;
pub mod config;
pub mod core;
pub mod error;
pub mod handshake;
pub mod heartbeat;
pub mod inbox;
pub mod reliable;
pub mod session;
pub mod sink;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{Session, SessionActivities, SessionHandle};
pub use sink::{ApplicationSink, Command, CommandSource};
