//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Errors parsing a `"<height>/<minerId>"` inventory key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseBlockIdError {
    /// No `/` between height and miner.
    #[error("Missing '/' in inventory key: {0}")]
    MissingSeparator(String),

    #[error("Invalid block height: {0}")]
    InvalidHeight(String),

    #[error("Invalid miner id: {0}")]
    InvalidMiner(String),
}

/// Errors parsing a node role or protocol name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRoleError {
    #[error("Unknown node role: {0}")]
    UnknownRole(String),

    #[error("Unknown protocol variant: {0}")]
    UnknownProtocol(String),
}
