//! Immutable cell representation.
//!
//! A Cell holds up to 1023 bits of data and up to 4 references to other
//! cells. Its representation hash covers the data and, recursively, the
//! hashes and depths of every referenced cell, so two cells are equal
//! exactly when their bits and reference trees are equal.

use std::sync::Arc;

use crate::{sha256, MAX_CELL_BITS, MAX_CELL_REFS};

/// Hash size in bytes (SHA256).
pub const HASH_BYTES: usize = 32;

/// A finalized TON cell.
///
/// Cells are only produced by [`CellBuilder::build`](crate::CellBuilder::build)
/// or by BoC deserialization, and never change afterwards. The hash and
/// depth are computed once at construction.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Raw data bytes; the last byte may be partially used.
    pub(crate) data: Vec<u8>,
    /// Number of bits stored in data.
    pub(crate) bit_len: usize,
    /// References to child cells.
    pub(crate) references: Vec<Arc<Cell>>,
    hash: [u8; HASH_BYTES],
    depth: u16,
}

impl Cell {
    pub(crate) fn new(data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(references.len() <= MAX_CELL_REFS);

        let depth = references
            .iter()
            .map(|r| r.depth)
            .max()
            .map_or(0, |d| d.saturating_add(1));

        let mut cell = Cell {
            data,
            bit_len,
            references,
            hash: [0u8; HASH_BYTES],
            depth,
        };
        cell.hash = sha256(&cell.representation());
        cell
    }

    /// Create an empty cell (no bits, no references).
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    /// Representation used for hashing: descriptors, padded data,
    /// child depths, child hashes.
    fn representation(&self) -> Vec<u8> {
        let mut repr =
            Vec::with_capacity(2 + self.data.len() + self.references.len() * (2 + HASH_BYTES));

        let (d1, d2) = self.descriptors();
        repr.push(d1);
        repr.push(d2);
        repr.extend_from_slice(&self.data_with_completion_tag());

        for reference in &self.references {
            repr.extend_from_slice(&reference.depth.to_be_bytes());
        }
        for reference in &self.references {
            repr.extend_from_slice(&reference.hash);
        }

        repr
    }

    /// Descriptor bytes `(d1, d2)`.
    ///
    /// d1 = number of references (ordinary cell, level 0);
    /// d2 = ceil(bit_len / 8) + floor(bit_len / 8).
    pub fn descriptors(&self) -> (u8, u8) {
        let d1 = self.references.len() as u8;
        let d2 = (self.bit_len.div_ceil(8) + self.bit_len / 8) as u8;
        (d1, d2)
    }

    /// Data bytes with the completion tag applied.
    ///
    /// When the bit length is not a multiple of 8, the bit right after the
    /// last data bit is set to 1 and the rest of the byte stays 0.
    pub fn data_with_completion_tag(&self) -> Vec<u8> {
        let mut result = self.data[..self.bit_len.div_ceil(8)].to_vec();
        let remainder = self.bit_len % 8;
        if remainder != 0
            && let Some(last) = result.last_mut()
        {
            *last |= 1 << (7 - remainder);
        }
        result
    }

    /// SHA-256 representation hash.
    pub fn hash(&self) -> [u8; HASH_BYTES] {
        self.hash
    }

    /// Depth: 0 for a leaf, otherwise 1 + the deepest reference.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Raw data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of data bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// All references to child cells.
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// A reference by index.
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    /// Number of references.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// A single data bit, or None past the end.
    pub fn get_bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        Some((self.data[index / 8] >> (7 - index % 8)) & 1 == 1)
    }

    /// Data bits rendered as a string of `0`/`1`.
    pub fn to_bit_string(&self) -> String {
        (0..self.bit_len)
            .map(|i| if self.get_bit(i) == Some(true) { '1' } else { '0' })
            .collect()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}
