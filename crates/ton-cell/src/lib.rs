//! TON cells for contract message bodies.
//!
//! This crate provides the bit-level building blocks used to encode
//! contract configuration and operation messages:
//!
//! - **Cell**: immutable node of up to 1023 bits and up to 4 references
//! - **CellBuilder**: single-use accumulator that produces a Cell
//! - **CellSlice**: sequential reader over a Cell
//! - **MsgAddress**: internal address (workchain + 256-bit account id)
//! - **BagOfCells**: standard BoC serialization of a cell tree
//!
//! # Layout rules
//!
//! Fields are written MSB-first in the exact order they are stored. The
//! order is part of the wire format: two bodies holding the same values in
//! a different order are different messages with different hashes.
//!
//! # Example
//!
//! ```
//! use ton_cell::{CellBuilder, CellSlice};
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(1)?.store_u64(0)?.store_coins(1_000_000_000)?;
//! let cell = builder.build()?;
//!
//! let mut slice = CellSlice::new(&cell);
//! assert_eq!(slice.load_u32()?, 1);
//! assert_eq!(slice.load_u64()?, 0);
//! assert_eq!(slice.load_coins()?, 1_000_000_000);
//! # Ok::<(), ton_cell::CellError>(())
//! ```

use sha2::{Digest, Sha256};
use thiserror::Error;

mod address;
mod boc;
mod builder;
mod cell;
mod slice;

pub use address::MsgAddress;
pub use boc::BagOfCells;
pub use builder::CellBuilder;
pub use cell::{Cell, HASH_BYTES};
pub use slice::CellSlice;

/// Errors that can occur while building, reading or serializing cells.
#[derive(Debug, Error)]
pub enum CellError {
    /// The cell data exceeds the maximum of 1023 bits.
    #[error("Cell data too long: {0} bits (max 1023)")]
    DataTooLong(usize),

    /// The cell has too many references (max 4).
    #[error("Too many cell references: {0} (max 4)")]
    TooManyRefs(usize),

    /// A value does not fit the declared field width.
    #[error("Value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: String, bits: usize },

    /// Invalid BoC format.
    #[error("Invalid BoC format: {0}")]
    InvalidBoc(String),

    /// Cell not found in BoC.
    #[error("Cell not found: index {0}")]
    CellNotFound(usize),

    /// CRC32 checksum mismatch.
    #[error("CRC32 mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// Unexpected end of data.
    #[error("Unexpected end of data")]
    UnexpectedEof,

    /// Not enough bits available.
    #[error("Not enough bits: need {need}, have {have}")]
    NotEnoughBits { need: usize, have: usize },

    /// Not enough references available.
    #[error("Not enough refs: need {need}, have {have}")]
    NotEnoughRefs { need: usize, have: usize },

    /// Invalid address format.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Invalid base64 encoding.
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    /// Expected single root but found multiple or none.
    #[error("Expected single root, found {0}")]
    NotSingleRoot(usize),

    /// Exotic cells (pruned branches, Merkle proofs, libraries) are not handled.
    #[error("Exotic cells are not supported")]
    ExoticCell,

    /// Referencing the cell would exceed the maximum tree depth.
    #[error("Cell depth {0} exceeds maximum 1024")]
    DepthTooLarge(usize),

    /// Invalid bit length.
    #[error("Invalid bit length: {0}")]
    InvalidBitLength(usize),

    /// String data is not valid UTF-8.
    #[error("Invalid UTF-8 string: {0}")]
    InvalidString(String),
}

/// Result type for Cell/BoC operations.
pub type CellResult<T> = Result<T, CellError>;

/// Maximum number of bits in a cell's data.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have.
pub const MAX_CELL_REFS: usize = 4;

/// Maximum depth of a cell tree.
pub const MAX_CELL_DEPTH: u16 = 1024;

/// Largest amount representable by `Coins` (VarUInteger 16): 2^120 - 1.
pub const MAX_COINS: u128 = (1u128 << 120) - 1;

/// Bytes of string data that fit in one snake continuation cell.
pub const SNAKE_BYTES_PER_CELL: usize = MAX_CELL_BITS / 8;

/// BoC magic number for generic BoC.
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// Compute SHA256 hash of the input data.
fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute CRC32-C checksum (Castagnoli polynomial).
fn crc32c(data: &[u8]) -> u32 {
    const CRC32C: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);
    CRC32C.checksum(data)
}
