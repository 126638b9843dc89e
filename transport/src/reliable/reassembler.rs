//! Fragment reassembly for incoming text and file messages.
//!
//! Unlike a sliding-window transport, this protocol's stop-and-wait sender
//! never has more than one fragment in flight, so out-of-order arrival from
//! a well-behaved peer cannot happen. The reassembler still tolerates a
//! duplicate or restarted index rather than panicking.

use std::collections::BTreeMap;

/// Accumulates fragments for one in-progress message (text or file).
#[derive(Debug, Default)]
pub struct Reassembler {
    fragments: BTreeMap<u16, Vec<u8>>,
    total_fragments: u16,
}

impl Reassembler {
    /// Creates an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one fragment's payload.
    ///
    /// If `current_fragment == 1`, any previously buffered fragments are
    /// discarded first — a restarted message takes priority over a stale,
    /// never-completed one.
    pub fn add_fragment(&mut self, current_fragment: u16, total_fragments: u16, payload: &[u8]) {
        if current_fragment == 1 {
            self.fragments.clear();
        }
        self.total_fragments = total_fragments;
        self.fragments.insert(current_fragment, payload.to_vec());
    }

    /// Returns true once every fragment in `1..=total_fragments` has been received.
    pub fn is_complete(&self) -> bool {
        self.total_fragments > 0
            && self.fragments.len() as u16 == self.total_fragments
            && (1..=self.total_fragments).all(|i| self.fragments.contains_key(&i))
    }

    /// Concatenates fragments `1..=total_fragments` in order and clears the buffer.
    pub fn take_completed(&mut self) -> Vec<u8> {
        let mut data = Vec::new();
        for i in 1..=self.total_fragments {
            if let Some(chunk) = self.fragments.get(&i) {
                data.extend_from_slice(chunk);
            }
        }
        self.fragments.clear();
        self.total_fragments = 0;
        data
    }
}
