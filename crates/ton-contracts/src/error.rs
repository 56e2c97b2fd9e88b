//! Error types for contract encoding, decoding and calls.

use thiserror::Error;

use crate::kind::ContractKind;
use crate::transport::TransportError;

/// Errors that can occur while building messages or decoding get-method results.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Cell operation error.
    #[error("Cell error: {0}")]
    Cell(#[from] ton_cell::CellError),

    /// A reference cell the layout requires was not provided.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Code compiled for one contract kind was used for another.
    #[error("Code artifact is for {actual}, expected {expected}")]
    CodeKindMismatch {
        expected: ContractKind,
        actual: ContractKind,
    },

    /// The get-method returned fewer stack entries than its signature declares.
    #[error("Stack underflow in {method}: expected {expected} entries, got {actual}")]
    StackUnderflow {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// A stack entry does not have the type the signature declares.
    #[error("Stack type mismatch in {method} at position {position}: expected {expected}, got {actual}")]
    StackTypeMismatch {
        method: String,
        position: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// A list operation was given no entries.
    #[error("List must contain at least one entry")]
    EmptyList,

    /// A reference-list tree does not have the expected shape.
    #[error("Invalid reference list: {0}")]
    InvalidRefList(String),

    /// Content cell does not start with a known TEP-64 layout byte.
    #[error("Invalid content layout: 0x{0:02x}")]
    InvalidContent(u8),

    /// Settings could not be parsed.
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    /// The transport failed to submit a message or run a get-method.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;
