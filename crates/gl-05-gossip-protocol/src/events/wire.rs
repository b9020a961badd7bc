//! # Wire Envelope
//!
//! Every gossip message is one JSON object followed by the `#` delimiter:
//!
//! ```text
//! {"type":"blocks","message":0,"inv":["2/7"]}#
//! ```
//!
//! `message` is the integer discriminator. Block messages carry `inv` keys or
//! a `blocks` array, which holds `"<height>/<minerId>"` keys in requests and
//! block records in replies. Transaction messages carry `transactions`.

use serde::{Deserialize, Serialize};
use shared_types::{Block, BlockId, PeerId, Transaction};

use super::{FrameError, GossipError};

/// Byte separating consecutive frames in a peer stream.
pub const FRAME_DELIMITER: u8 = b'#';

/// Message discriminators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Inv,
    RequestTrans,
    GetHeaders,
    Headers,
    GetData,
    Block,
    NoMessage,
    ReplyTrans,
    MsgTrans,
    ResultTrans,
}

impl MessageKind {
    pub fn code(self) -> i64 {
        match self {
            Self::Inv => 0,
            Self::RequestTrans => 1,
            Self::GetHeaders => 2,
            Self::Headers => 3,
            Self::GetData => 4,
            Self::Block => 5,
            Self::NoMessage => 6,
            Self::ReplyTrans => 7,
            Self::MsgTrans => 8,
            Self::ResultTrans => 9,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Inv,
            1 => Self::RequestTrans,
            2 => Self::GetHeaders,
            3 => Self::Headers,
            4 => Self::GetData,
            5 => Self::Block,
            6 => Self::NoMessage,
            7 => Self::ReplyTrans,
            8 => Self::MsgTrans,
            9 => Self::ResultTrans,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Inv => "INV",
            Self::RequestTrans => "REQUEST_TRANS",
            Self::GetHeaders => "GET_HEADERS",
            Self::Headers => "HEADERS",
            Self::GetData => "GET_DATA",
            Self::Block => "BLOCK",
            Self::NoMessage => "NO_MESSAGE",
            Self::ReplyTrans => "REPLY_TRANS",
            Self::MsgTrans => "MSG_TRANS",
            Self::ResultTrans => "RESULT_TRANS",
        }
    }

    fn is_transaction_message(self) -> bool {
        matches!(
            self,
            Self::RequestTrans | Self::ReplyTrans | Self::MsgTrans | Self::ResultTrans
        )
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The `blocks` field: keys when asking, records when answering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockPayload {
    Keys(Vec<String>),
    Records(Vec<Block>),
}

/// One decoded gossip message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub label: String,
    /// Raw discriminator; values outside the known set decode fine and are
    /// ignored by dispatch.
    pub message: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inv: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<BlockPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<Transaction>,
}

impl Envelope {
    fn empty(kind: MessageKind) -> Self {
        let label = if kind.is_transaction_message() {
            "transactions"
        } else {
            "blocks"
        };
        Self {
            label: label.to_string(),
            message: kind.code(),
            inv: Vec::new(),
            blocks: None,
            transactions: Vec::new(),
        }
    }

    pub fn inv(ids: impl IntoIterator<Item = BlockId>) -> Self {
        Self {
            inv: ids.into_iter().map(|id| id.to_string()).collect(),
            ..Self::empty(MessageKind::Inv)
        }
    }

    pub fn get_headers(ids: &[BlockId]) -> Self {
        Self::with_keys(MessageKind::GetHeaders, ids)
    }

    pub fn get_data(ids: &[BlockId]) -> Self {
        Self::with_keys(MessageKind::GetData, ids)
    }

    pub fn headers(headers: Vec<Block>) -> Self {
        Self::with_records(MessageKind::Headers, headers)
    }

    pub fn block(blocks: Vec<Block>) -> Self {
        Self::with_records(MessageKind::Block, blocks)
    }

    pub fn request_trans(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            ..Self::empty(MessageKind::RequestTrans)
        }
    }

    pub fn reply_trans(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            ..Self::empty(MessageKind::ReplyTrans)
        }
    }

    // An empty `blocks` list is left off the wire: `[]` would decode as keys
    // whatever it was built from.
    fn with_keys(kind: MessageKind, ids: &[BlockId]) -> Self {
        Self {
            blocks: (!ids.is_empty())
                .then(|| BlockPayload::Keys(ids.iter().map(BlockId::to_string).collect())),
            ..Self::empty(kind)
        }
    }

    fn with_records(kind: MessageKind, records: Vec<Block>) -> Self {
        Self {
            blocks: (!records.is_empty()).then(|| BlockPayload::Records(records)),
            ..Self::empty(kind)
        }
    }

    /// Known discriminator, if any.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_code(self.message)
    }

    /// Keys in `blocks`; empty when it carries records.
    pub fn block_keys(&self) -> &[String] {
        match &self.blocks {
            Some(BlockPayload::Keys(keys)) => keys,
            _ => &[],
        }
    }

    /// Records in `blocks`; empty when it carries keys.
    pub fn block_records(&self) -> &[Block] {
        match &self.blocks {
            Some(BlockPayload::Records(records)) => records,
            _ => &[],
        }
    }

    /// Number of items the message lists, whatever field carries them.
    pub fn item_count(&self) -> usize {
        let blocks = match &self.blocks {
            Some(BlockPayload::Keys(keys)) => keys.len(),
            Some(BlockPayload::Records(records)) => records.len(),
            None => 0,
        };
        self.inv.len() + blocks + self.transactions.len()
    }

    pub fn decode(peer: PeerId, frame: &[u8]) -> Result<Self, FrameError> {
        serde_json::from_slice(frame).map_err(|source| FrameError::Decode { peer, source })
    }

    /// Serialize and append the frame delimiter.
    pub fn encode_frame(&self) -> Result<Vec<u8>, GossipError> {
        let mut bytes = serde_json::to_vec(self)?;
        if bytes.contains(&FRAME_DELIMITER) {
            let kind = self.kind().map_or("unknown", MessageKind::name);
            return Err(FrameError::DelimiterInPayload { kind }.into());
        }
        bytes.push(FRAME_DELIMITER);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminator_codes() {
        for code in 0..10 {
            let kind = MessageKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert_eq!(MessageKind::from_code(10), None);
        assert_eq!(MessageKind::from_code(-1), None);
        assert_eq!(MessageKind::ReplyTrans.code(), 7);
    }

    #[test]
    fn test_inv_wire_shape() {
        let frame = Envelope::inv([BlockId::new(2, 7)]).encode_frame().unwrap();
        assert_eq!(frame.last(), Some(&FRAME_DELIMITER));
        let json: serde_json::Value = serde_json::from_slice(&frame[..frame.len() - 1]).unwrap();
        assert_eq!(json["type"], "blocks");
        assert_eq!(json["message"], 0);
        assert_eq!(json["inv"][0], "2/7");
        assert!(json.get("transactions").is_none());
    }

    #[test]
    fn test_requests_carry_keys_in_blocks() {
        let env = Envelope::get_data(&[BlockId::new(1, 2), BlockId::new(3, 4)]);
        assert_eq!(env.kind(), Some(MessageKind::GetData));
        assert_eq!(env.block_keys(), ["1/2".to_string(), "3/4".to_string()]);
        assert!(env.block_records().is_empty());
    }

    #[test]
    fn test_records_decode_as_records() {
        let block = Block::new(3, 1, 5, 2, 400, 7.5);
        let frame = Envelope::block(vec![block.clone()]).encode_frame().unwrap();
        let decoded = Envelope::decode(PeerId(1), &frame[..frame.len() - 1]).unwrap();
        assert_eq!(decoded.block_records(), [block]);
        assert!(decoded.block_keys().is_empty());
    }

    #[test]
    fn test_empty_payloads_survive_the_wire() {
        for env in [
            Envelope::block(Vec::new()),
            Envelope::headers(Vec::new()),
            Envelope::get_data(&[]),
        ] {
            let frame = env.encode_frame().unwrap();
            let json: serde_json::Value =
                serde_json::from_slice(&frame[..frame.len() - 1]).unwrap();
            assert!(json.get("blocks").is_none());
            let decoded = Envelope::decode(PeerId(1), &frame[..frame.len() - 1]).unwrap();
            assert_eq!(decoded, env);
            assert_eq!(decoded.item_count(), 0);
        }
    }

    #[test]
    fn test_unknown_discriminator_decodes() {
        let env = Envelope::decode(PeerId(1), br#"{"type":"blocks","message":42}"#).unwrap();
        assert_eq!(env.message, 42);
        assert_eq!(env.kind(), None);
        assert_eq!(env.item_count(), 0);
    }

    #[test]
    fn test_transaction_messages() {
        let mut tx = Transaction::new(3, 9, 1.25);
        tx.set_execution(5);
        let env = Envelope::reply_trans(vec![tx.clone()]);
        assert_eq!(env.label, "transactions");
        let frame = env.encode_frame().unwrap();
        let decoded = Envelope::decode(PeerId(0), &frame[..frame.len() - 1]).unwrap();
        assert_eq!(decoded.transactions, vec![tx]);
        assert_eq!(decoded.kind(), Some(MessageKind::ReplyTrans));
    }

    #[test]
    fn test_malformed_frame_is_error() {
        assert!(matches!(
            Envelope::decode(PeerId(3), b"{not json"),
            Err(FrameError::Decode { peer: PeerId(3), .. })
        ));
    }
}
