//! # Node Roles and Protocol Variants
//!
//! A node's role decides how it treats transactions; the protocol variant
//! decides how it advertises new blocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseRoleError;

/// Role a node plays in the transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeRole {
    /// Forwards and validates, never executes.
    #[default]
    Committer,
    /// Executes transaction requests it has not seen.
    Endorser,
    /// Originates transactions, ignores inventory.
    Client,
    /// Ordering service; forwards like a committer.
    Order,
}

impl NodeRole {
    /// Numeric code recorded in statistics (`nodeType`).
    pub fn code(self) -> u8 {
        match self {
            Self::Committer => 0,
            Self::Endorser => 1,
            Self::Client => 2,
            Self::Order => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Committer),
            1 => Some(Self::Endorser),
            2 => Some(Self::Client),
            3 => Some(Self::Order),
            _ => None,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Committer => "committer",
            Self::Endorser => "endorser",
            Self::Client => "client",
            Self::Order => "order",
        };
        f.write_str(name)
    }
}

impl FromStr for NodeRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "committer" => Ok(Self::Committer),
            "endorser" => Ok(Self::Endorser),
            "client" => Ok(Self::Client),
            "order" | "orderer" => Ok(Self::Order),
            other => Err(ParseRoleError::UnknownRole(other.to_string())),
        }
    }
}

/// How a node announces blocks it has newly stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolVariant {
    /// Announce with `INV`; peers pull headers and data.
    #[default]
    Standard,
    /// Push the header directly with `HEADERS`.
    SendHeaders,
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::SendHeaders => f.write_str("sendheaders"),
        }
    }
}

impl FromStr for ProtocolVariant {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "standard" => Ok(Self::Standard),
            "sendheaders" => Ok(Self::SendHeaders),
            other => Err(ParseRoleError::UnknownProtocol(other.to_string())),
        }
    }
}
