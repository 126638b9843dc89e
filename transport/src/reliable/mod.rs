//! Reliability mechanisms layered on top of the raw frame codec.
//!
//! - Reassembler: in-order fragment accumulation for text and file messages
//! - RetransmitStats: stop-and-wait retransmission counters

mod reassembler;
mod retransmit;

pub use reassembler::Reassembler;
pub use retransmit::RetransmitStats;
