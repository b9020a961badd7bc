//! Wire messages and error types for the gossip protocol.

use shared_types::{ParseBlockIdError, PeerId};
use thiserror::Error;

pub mod wire;

pub use wire::*;

/// Errors reassembling or encoding frames.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Undecodable frame from {peer}: {source}")]
    Decode {
        peer: PeerId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Encoded {kind} payload contains the frame delimiter")]
    DelimiterInPayload { kind: &'static str },
}

/// Gossip protocol errors.
///
/// None of these are fatal to a node: the session logs them and drops the
/// offending item.
#[derive(Debug, Error)]
pub enum GossipError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Bad inventory key: {0}")]
    InventoryKey(#[from] ParseBlockIdError),

    #[error("Unknown message discriminator: {0}")]
    UnknownMessage(i64),
}
