//! CellBuilder for constructing TON cells.
//!
//! Every `store_*` call checks the declared width of the value and the
//! 1023-bit / 4-reference ceilings before writing anything, then appends
//! MSB-first. `build()` consumes the builder, so a finalized builder cannot
//! be written to again.

use std::sync::Arc;

use crate::{
    Cell, CellError, CellResult, MAX_CELL_BITS, MAX_CELL_DEPTH, MAX_CELL_REFS, MAX_COINS, MsgAddress,
    SNAKE_BYTES_PER_CELL,
};

/// Builder for constructing TON cells.
///
/// # Example
///
/// ```
/// use ton_cell::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// builder.store_bytes(&[1, 2, 3, 4]).unwrap();
/// let cell = builder.build().unwrap();
/// assert_eq!(cell.bit_len(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct CellBuilder {
    /// Data buffer.
    data: Vec<u8>,
    /// Number of bits written so far.
    bit_len: usize,
    /// References to other cells.
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Create a new empty CellBuilder.
    pub fn new() -> Self {
        CellBuilder {
            data: Vec::with_capacity(128),
            bit_len: 0,
            references: Vec::new(),
        }
    }

    fn ensure_bits(&self, bits: usize) -> CellResult<()> {
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + bits));
        }
        Ok(())
    }

    fn ensure_refs(&self, refs: usize) -> CellResult<()> {
        if self.references.len() + refs > MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(self.references.len() + refs));
        }
        Ok(())
    }

    /// Store a single bit.
    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.ensure_bits(1)?;

        let byte_index = self.bit_len / 8;
        if byte_index >= self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[byte_index] |= 1 << (7 - self.bit_len % 8);
        }

        self.bit_len += 1;
        Ok(self)
    }

    /// Store multiple bits.
    pub fn store_bits(&mut self, bits: &[bool]) -> CellResult<&mut Self> {
        self.ensure_bits(bits.len())?;
        for &bit in bits {
            self.store_bit(bit)?;
        }
        Ok(self)
    }

    /// Store an unsigned 8-bit integer.
    pub fn store_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 8)
    }

    /// Store an unsigned 16-bit integer (big-endian).
    pub fn store_u16(&mut self, value: u16) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 16)
    }

    /// Store an unsigned 32-bit integer (big-endian).
    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 32)
    }

    /// Store an unsigned 64-bit integer (big-endian).
    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_uint(value, 64)
    }

    /// Store a signed 8-bit integer.
    pub fn store_i8(&mut self, value: i8) -> CellResult<&mut Self> {
        self.store_int(value as i64, 8)
    }

    /// Store an unsigned integer with a specific bit width.
    ///
    /// Fails unless `0 <= value < 2^bits`.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        if bits < 64 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        self.ensure_bits(bits)?;

        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    /// Store a signed integer with a specific bit width (two's complement).
    ///
    /// Fails unless `-2^(bits-1) <= value < 2^(bits-1)`.
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        let fits = match bits {
            0 => value == 0,
            64 => true,
            _ => {
                let bound = 1i64 << (bits - 1);
                (-bound..bound).contains(&value)
            }
        };
        if !fits {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }

        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        self.store_uint(value as u64 & mask, bits)
    }

    /// Store a byte array.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.ensure_bits(bytes.len() * 8)?;
        for &byte in bytes {
            self.store_u8(byte)?;
        }
        Ok(self)
    }

    /// Store a reference to another cell.
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        self.ensure_refs(1)?;
        if cell.depth() >= MAX_CELL_DEPTH {
            return Err(CellError::DepthTooLarge(cell.depth() as usize + 1));
        }
        self.references.push(cell);
        Ok(self)
    }

    /// Store `Maybe ^Cell`: a presence bit, then the reference if present.
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> CellResult<&mut Self> {
        match cell {
            Some(cell) => {
                self.ensure_bits(1)?;
                self.ensure_refs(1)?;
                self.store_bit(true)?;
                self.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    /// Store coins (VarUInteger 16).
    ///
    /// Format: 4-bit byte length, then that many big-endian value bytes.
    /// Zero is a single zero nibble. Amounts above 2^120 - 1 are rejected.
    pub fn store_coins(&mut self, nanotons: u128) -> CellResult<&mut Self> {
        if nanotons > MAX_COINS {
            return Err(CellError::ValueOutOfRange {
                value: nanotons.to_string(),
                bits: 120,
            });
        }

        let byte_len = (128 - nanotons.leading_zeros() as usize).div_ceil(8);
        self.ensure_bits(4 + byte_len * 8)?;
        self.store_uint(byte_len as u64, 4)?;

        for i in (0..byte_len).rev() {
            self.store_u8((nanotons >> (i * 8)) as u8)?;
        }
        Ok(self)
    }

    /// Store a message address.
    ///
    /// `addr_none$00` for Null, otherwise
    /// `addr_std$10 anycast:0 workchain_id:int8 address:bits256`.
    pub fn store_address(&mut self, addr: &MsgAddress) -> CellResult<&mut Self> {
        match addr {
            MsgAddress::Null => self.store_uint(0b00, 2),
            MsgAddress::Internal { workchain, address } => {
                if !(i8::MIN as i32..=i8::MAX as i32).contains(workchain) {
                    return Err(CellError::ValueOutOfRange {
                        value: workchain.to_string(),
                        bits: 8,
                    });
                }
                self.ensure_bits(MsgAddress::STD_BITS)?;
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_i8(*workchain as i8)?;
                self.store_bytes(address)
            }
        }
    }

    /// Store an optional address; `None` is written as `addr_none`.
    pub fn store_address_opt(&mut self, addr: Option<&MsgAddress>) -> CellResult<&mut Self> {
        self.store_address(addr.unwrap_or(&MsgAddress::Null))
    }

    /// Store UTF-8 text with no length prefix, entirely in this cell.
    ///
    /// Use this for text followed by further fields: it never spills into a
    /// reference, and fails with `DataTooLong` when the text does not fit.
    pub fn store_string_inline(&mut self, text: &str) -> CellResult<&mut Self> {
        let bytes = text.as_bytes();
        if bytes.len() * 8 > self.bits_left() {
            return Err(CellError::DataTooLong(self.bit_len + bytes.len() * 8));
        }
        self.store_bytes(bytes)
    }

    /// Store UTF-8 text with no length prefix, as the last field of a layout.
    ///
    /// Bytes that fit are written inline. If the text is longer than the
    /// remaining space, the rest continues in a snake chain of referenced
    /// cells (127 bytes each), which needs one free reference slot here.
    pub fn store_string_tail(&mut self, text: &str) -> CellResult<&mut Self> {
        let bytes = text.as_bytes();
        let available = self.bits_left() / 8;

        if bytes.len() <= available {
            return self.store_bytes(bytes);
        }

        if self.refs_left() == 0 {
            return Err(CellError::DataTooLong(self.bit_len + bytes.len() * 8));
        }

        let (head, rest) = bytes.split_at(available);
        let continuation = build_snake_chain(rest)?;
        self.store_bytes(head)?;
        self.store_ref(continuation)
    }

    /// Number of bits that can still be stored.
    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    /// Number of references that can still be added.
    pub fn refs_left(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    /// Number of bits stored so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Number of references stored so far.
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Finalize into an immutable Cell, consuming the builder.
    pub fn build(self) -> CellResult<Cell> {
        Ok(Cell::new(self.data, self.bit_len, self.references))
    }
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the continuation cells of a snake string, last chunk first.
fn build_snake_chain(data: &[u8]) -> CellResult<Arc<Cell>> {
    let mut next: Option<Arc<Cell>> = None;

    for chunk in data.chunks(SNAKE_BYTES_PER_CELL).rev() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(chunk)?;
        if let Some(tail) = next.take() {
            builder.store_ref(tail)?;
        }
        next = Some(Arc::new(builder.build()?));
    }

    next.ok_or(CellError::UnexpectedEof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellSlice;
    use proptest::prelude::*;

    #[test]
    fn test_new_builder() {
        let builder = CellBuilder::new();
        assert_eq!(builder.bit_len(), 0);
        assert_eq!(builder.ref_count(), 0);
        assert_eq!(builder.bits_left(), MAX_CELL_BITS);
        assert_eq!(builder.refs_left(), MAX_CELL_REFS);
    }

    #[test]
    fn test_store_bits_layout() {
        let mut builder = CellBuilder::new();
        builder.store_bit(true).unwrap();
        builder.store_bit(false).unwrap();
        builder.store_bit(true).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.data(), &[0b1010_0000]);
    }

    #[test]
    fn test_store_u32_big_endian() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x12345678).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.data(), &[0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_store_uint_rejects_wide_bit_length() {
        let mut builder = CellBuilder::new();
        assert!(matches!(
            builder.store_uint(1, 65),
            Err(CellError::InvalidBitLength(65))
        ));
    }

    #[test]
    fn test_store_int_range() {
        let mut builder = CellBuilder::new();
        builder.store_int(-128, 8).unwrap();
        builder.store_int(127, 8).unwrap();
        assert!(builder.store_int(128, 8).is_err());
        assert!(builder.store_int(-129, 8).is_err());

        let cell = builder.build().unwrap();
        assert_eq!(cell.data(), &[0x80, 0x7F]);
    }

    #[test]
    fn test_ceiling_checked_before_writing() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(&[0u8; 127]).unwrap();
        assert_eq!(builder.bits_left(), 7);
        assert!(builder.store_u8(1).is_err());
        // nothing was written by the failed call
        assert_eq!(builder.bit_len(), 1016);
        builder.store_uint(0x7F, 7).unwrap();
        assert!(builder.store_bit(true).is_err());
    }

    #[test]
    fn test_coins_overflow() {
        let mut builder = CellBuilder::new();
        builder.store_coins(MAX_COINS).unwrap();
        assert_eq!(builder.bit_len(), 4 + 120);
        assert!(matches!(
            builder.store_coins(MAX_COINS + 1),
            Err(CellError::ValueOutOfRange { bits: 120, .. })
        ));
    }

    #[test]
    fn test_address_workchain_out_of_range() {
        let addr = MsgAddress::Internal {
            workchain: 300,
            address: [0; 32],
        };
        let mut builder = CellBuilder::new();
        assert!(builder.store_address(&addr).is_err());
        assert_eq!(builder.bit_len(), 0);
    }

    #[test]
    fn test_depth_limit() {
        let mut cell = Arc::new(Cell::empty());
        for _ in 0..MAX_CELL_DEPTH {
            let mut builder = CellBuilder::new();
            builder.store_ref(cell).unwrap();
            cell = Arc::new(builder.build().unwrap());
        }
        assert_eq!(cell.depth(), MAX_CELL_DEPTH);

        let mut builder = CellBuilder::new();
        assert!(matches!(
            builder.store_ref(cell),
            Err(CellError::DepthTooLarge(1025))
        ));
    }

    #[test]
    fn test_maybe_ref() {
        let mut builder = CellBuilder::new();
        builder.store_maybe_ref(None).unwrap();
        builder
            .store_maybe_ref(Some(Arc::new(Cell::empty())))
            .unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.to_bit_string(), "01");
        assert_eq!(cell.reference_count(), 1);
    }

    #[test]
    fn test_string_tail_inline() {
        let mut builder = CellBuilder::new();
        builder.store_u32(1).unwrap();
        builder.store_string_tail("gold").unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 32 + 32);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(&cell.data()[4..], b"gold");
    }

    #[test]
    fn test_string_tail_snakes_into_references() {
        let text: String = std::iter::repeat_n('x', 300).collect();
        let mut builder = CellBuilder::new();
        builder.store_u64(0).unwrap();
        builder.store_string_tail(&text).unwrap();
        let cell = builder.build().unwrap();

        // 1023 - 64 = 959 bits -> 119 bytes inline, 181 bytes in two continuation cells
        assert_eq!(cell.bit_len(), 64 + 119 * 8);
        let first = cell.reference(0).unwrap();
        assert_eq!(first.bit_len(), 127 * 8);
        let second = first.reference(0).unwrap();
        assert_eq!(second.bit_len(), 54 * 8);
        assert_eq!(second.reference_count(), 0);

        let mut slice = CellSlice::new(&cell);
        slice.skip_bits(64).unwrap();
        assert_eq!(slice.load_string_tail().unwrap(), text);
    }

    #[test]
    fn test_string_tail_without_free_reference() {
        let leaf = Arc::new(Cell::empty());
        let mut builder = CellBuilder::new();
        for _ in 0..4 {
            builder.store_ref(leaf.clone()).unwrap();
        }
        builder.store_bytes(&[0u8; 120]).unwrap();
        let text: String = std::iter::repeat_n('y', 10).collect();
        assert!(matches!(
            builder.store_string_tail(&text),
            Err(CellError::DataTooLong(_))
        ));
    }

    #[test]
    fn test_string_inline_never_takes_a_reference() {
        let mut builder = CellBuilder::new();
        builder.store_u64(0).unwrap();
        builder.store_string_inline("silver").unwrap();
        assert_eq!(builder.bit_len(), 64 + 48);
        assert_eq!(builder.ref_count(), 0);

        // 1023 - 112 = 911 bits -> 113 whole bytes left
        let text: String = std::iter::repeat_n('z', 114).collect();
        assert!(matches!(
            builder.store_string_inline(&text),
            Err(CellError::DataTooLong(1024))
        ));
        assert_eq!(builder.bit_len(), 64 + 48);
        assert_eq!(builder.ref_count(), 0);

        builder.store_string_inline(&text[..113]).unwrap();
        assert_eq!(builder.bit_len(), 64 + 48 + 113 * 8);
        assert_eq!(builder.ref_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_store_uint_accepts_exactly_fitting_values(value: u64, bits in 1usize..64) {
            let mut builder = CellBuilder::new();
            let fits = value < (1u64 << bits);
            prop_assert_eq!(builder.store_uint(value, bits).is_ok(), fits);
            if fits {
                let cell = builder.build().unwrap();
                let mut slice = CellSlice::new(&cell);
                prop_assert_eq!(slice.load_uint(bits).unwrap(), value);
            }
        }

        #[test]
        fn prop_coins_length_nibble(amount in 0u128..=MAX_COINS) {
            let mut builder = CellBuilder::new();
            builder.store_coins(amount).unwrap();
            let cell = builder.build().unwrap();
            let mut slice = CellSlice::new(&cell);
            let len = slice.load_uint(4).unwrap() as usize;
            prop_assert_eq!(cell.bit_len(), 4 + len * 8);
            prop_assert_eq!(len, (128 - amount.leading_zeros() as usize).div_ceil(8));
        }
    }
}
