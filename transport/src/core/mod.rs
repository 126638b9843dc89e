//! Core wire-level data structures for the transport protocol.
//!
//! This module contains the fundamental building blocks:
//! - Frame: the 10-byte-header wire unit, with encode/decode
//! - Checksum: CRC-16/XMODEM for payload integrity verification

mod checksum;
mod frame;

pub use checksum::Crc16;
pub use frame::{Frame, MsgType, FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
