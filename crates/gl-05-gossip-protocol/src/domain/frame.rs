//! # Frame Decoder
//!
//! Reassembles each peer's byte stream into delimiter-bounded frames.
//!
//! Bytes after the last delimiter stay buffered for that peer until the rest
//! of the frame arrives. Frames that do not decode are logged and skipped;
//! the stream carries on with the next one.

use shared_types::PeerId;
use std::collections::HashMap;
use tracing::warn;

use crate::events::{Envelope, FRAME_DELIMITER};

/// Per-peer reassembly buffers.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffers: HashMap<PeerId, Vec<u8>>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` to `peer`'s buffer and iterate the complete frames.
    ///
    /// Frames are consumed lazily. Any not pulled before the iterator is
    /// dropped stay buffered and come out of the next `feed` for that peer.
    pub fn feed(&mut self, peer: PeerId, bytes: &[u8]) -> Frames<'_> {
        let buffer = self.buffers.entry(peer).or_default();
        buffer.extend_from_slice(bytes);
        Frames {
            peer,
            buffer,
            consumed: 0,
        }
    }

    /// Bytes held for `peer` that do not yet form a complete frame.
    pub fn pending_bytes(&self, peer: PeerId) -> usize {
        self.buffers.get(&peer).map_or(0, Vec::len)
    }

    /// Forget a peer's partial frame.
    pub fn reset(&mut self, peer: PeerId) {
        self.buffers.remove(&peer);
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

/// Lazy iterator over the decoded frames of one `feed`.
pub struct Frames<'a> {
    peer: PeerId,
    buffer: &'a mut Vec<u8>,
    consumed: usize,
}

impl Iterator for Frames<'_> {
    type Item = Envelope;

    fn next(&mut self) -> Option<Envelope> {
        loop {
            let rest = &self.buffer[self.consumed..];
            let len = rest.iter().position(|&b| b == FRAME_DELIMITER)?;
            let frame = &rest[..len];
            self.consumed += len + 1;

            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match Envelope::decode(self.peer, frame) {
                Ok(envelope) => return Some(envelope),
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "[gl-05] Dropping corrupted frame");
                }
            }
        }
    }
}

impl Drop for Frames<'_> {
    fn drop(&mut self) {
        self.buffer.drain(..self.consumed);
    }
}
