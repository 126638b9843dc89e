//! Send and receive paths for the transport protocol.
//!
//! This module provides the sender (fragmentation + stop-and-wait ARQ) and
//! the receiver (demultiplexing, integrity checks, reassembly) halves of
//! the data path.

mod receiver;
mod sender;

pub use receiver::{Outcome, ReceivePath};
pub use sender::{AckInbox, AckSignal, Sender};
