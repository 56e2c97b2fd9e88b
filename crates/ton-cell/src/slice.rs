//! CellSlice for reading data from TON cells.
//!
//! A CellSlice provides methods to sequentially read data from a cell,
//! tracking the current position within the cell's data and references.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, MsgAddress};

/// A slice view into a Cell for reading data.
///
/// CellSlice tracks the current read position and allows sequential
/// reading of bits, integers, bytes, and references.
///
/// # Example
///
/// ```
/// use ton_cell::{CellBuilder, CellSlice};
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// let cell = builder.build().unwrap();
///
/// let mut slice = CellSlice::new(&cell);
/// let value = slice.load_u32().unwrap();
/// assert_eq!(value, 0x12345678);
/// ```
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    /// Reference to the underlying cell.
    cell: &'a Cell,
    /// Current bit offset within the cell data.
    bit_offset: usize,
    /// Number of bits remaining (from bit_offset).
    bit_len: usize,
    /// Current reference offset.
    ref_offset: usize,
}

impl<'a> CellSlice<'a> {
    /// Create a new slice from a cell.
    pub fn new(cell: &'a Cell) -> Self {
        CellSlice {
            cell,
            bit_offset: 0,
            bit_len: cell.bit_len(),
            ref_offset: 0,
        }
    }

    /// Load a single bit.
    pub fn load_bit(&mut self) -> CellResult<bool> {
        if self.bit_len == 0 {
            return Err(CellError::NotEnoughBits { need: 1, have: 0 });
        }

        let bit = self.get_bit_at(self.bit_offset);
        self.bit_offset += 1;
        self.bit_len -= 1;
        Ok(bit)
    }

    /// Load an unsigned 8-bit integer.
    pub fn load_u8(&mut self) -> CellResult<u8> {
        self.load_uint(8).map(|v| v as u8)
    }

    /// Load an unsigned 16-bit integer (big-endian).
    pub fn load_u16(&mut self) -> CellResult<u16> {
        self.load_uint(16).map(|v| v as u16)
    }

    /// Load an unsigned 32-bit integer (big-endian).
    pub fn load_u32(&mut self) -> CellResult<u32> {
        self.load_uint(32).map(|v| v as u32)
    }

    /// Load an unsigned 64-bit integer (big-endian).
    pub fn load_u64(&mut self) -> CellResult<u64> {
        self.load_uint(64)
    }

    /// Load a signed 8-bit integer.
    pub fn load_i8(&mut self) -> CellResult<i8> {
        self.load_int(8).map(|v| v as i8)
    }

    /// Load an unsigned integer with a specific bit width.
    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits == 0 {
            return Ok(0);
        }

        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }

        if bits > self.bit_len {
            return Err(CellError::NotEnoughBits {
                need: bits,
                have: self.bit_len,
            });
        }

        let mut result: u64 = 0;
        for _ in 0..bits {
            result = (result << 1) | (self.load_bit()? as u64);
        }

        Ok(result)
    }

    /// Load a signed integer with a specific bit width (two's complement).
    pub fn load_int(&mut self, bits: usize) -> CellResult<i64> {
        if bits == 0 {
            return Ok(0);
        }

        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }

        let unsigned = self.load_uint(bits)?;
        let shift = 64 - bits;
        Ok(((unsigned << shift) as i64) >> shift)
    }

    /// Load a byte array.
    pub fn load_bytes(&mut self, count: usize) -> CellResult<Vec<u8>> {
        let bits_needed = count * 8;
        if bits_needed > self.bit_len {
            return Err(CellError::NotEnoughBits {
                need: bits_needed,
                have: self.bit_len,
            });
        }

        let mut result = Vec::with_capacity(count);
        for _ in 0..count {
            result.push(self.load_u8()?);
        }
        Ok(result)
    }

    /// Load a reference to another cell.
    pub fn load_ref(&mut self) -> CellResult<&'a Cell> {
        if self.refs_left() == 0 {
            return Err(CellError::NotEnoughRefs { need: 1, have: 0 });
        }

        let reference = self
            .cell
            .reference(self.ref_offset)
            .ok_or(CellError::CellNotFound(self.ref_offset))?;
        self.ref_offset += 1;
        Ok(reference.as_ref())
    }

    /// Load a reference as a shared handle.
    pub fn load_ref_arc(&mut self) -> CellResult<Arc<Cell>> {
        let index = self.ref_offset;
        self.load_ref()?;
        self.cell
            .reference(index)
            .cloned()
            .ok_or(CellError::CellNotFound(index))
    }

    /// Load coins (VarUInteger 16).
    ///
    /// Format: 4 bits for byte length, then the value in that many bytes.
    pub fn load_coins(&mut self) -> CellResult<u128> {
        let byte_len = self.load_uint(4)? as usize;

        if byte_len == 0 {
            return Ok(0);
        }

        let mut result: u128 = 0;
        for _ in 0..byte_len {
            result = (result << 8) | (self.load_u8()? as u128);
        }

        Ok(result)
    }

    /// Load `Maybe ^Cell`: a presence bit, then the reference if set.
    pub fn load_maybe_ref(&mut self) -> CellResult<Option<&'a Cell>> {
        if self.load_bit()? {
            self.load_ref().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load a message address.
    ///
    /// Accepts `addr_none$00` and `addr_std$10` without anycast; any other
    /// address form is rejected.
    pub fn load_address(&mut self) -> CellResult<MsgAddress> {
        let addr_type = self.load_uint(2)? as u8;

        match addr_type {
            0b00 => Ok(MsgAddress::Null),
            0b10 => {
                if self.load_bit()? {
                    return Err(CellError::InvalidAddress(
                        "anycast addresses are not supported".into(),
                    ));
                }

                let workchain = self.load_i8()? as i32;
                let address_bytes = self.load_bytes(32)?;
                let mut address = [0u8; 32];
                address.copy_from_slice(&address_bytes);

                Ok(MsgAddress::Internal { workchain, address })
            }
            _ => Err(CellError::InvalidAddress(format!(
                "Unsupported address type: {:02b}",
                addr_type
            ))),
        }
    }

    /// Load an address that may be `addr_none`.
    pub fn load_address_opt(&mut self) -> CellResult<Option<MsgAddress>> {
        match self.load_address()? {
            MsgAddress::Null => Ok(None),
            addr => Ok(Some(addr)),
        }
    }

    /// Load `len` bytes as UTF-8 text.
    pub fn load_string(&mut self, len: usize) -> CellResult<String> {
        let bytes = self.load_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| CellError::InvalidString(e.to_string()))
    }

    /// Load a snake string: every remaining byte of this slice, then the
    /// bytes of each continuation cell reached through the next reference.
    pub fn load_string_tail(&mut self) -> CellResult<String> {
        if self.bit_len % 8 != 0 {
            return Err(CellError::InvalidString(format!(
                "{} bits left, not a whole number of bytes",
                self.bit_len
            )));
        }

        let mut bytes = self.load_bytes(self.bit_len / 8)?;
        let mut next = if self.refs_left() > 0 {
            Some(self.load_ref()?)
        } else {
            None
        };

        while let Some(cell) = next {
            let mut part = CellSlice::new(cell);
            if part.bits_left() % 8 != 0 {
                return Err(CellError::InvalidString(format!(
                    "continuation cell holds {} bits",
                    part.bits_left()
                )));
            }
            bytes.extend(part.load_bytes(part.bits_left() / 8)?);
            next = if part.refs_left() > 0 {
                Some(part.load_ref()?)
            } else {
                None
            };
        }

        String::from_utf8(bytes).map_err(|e| CellError::InvalidString(e.to_string()))
    }

    /// Get the number of bits remaining.
    pub fn bits_left(&self) -> usize {
        self.bit_len
    }

    /// Get the number of references remaining.
    pub fn refs_left(&self) -> usize {
        self.cell.reference_count() - self.ref_offset
    }

    /// Skip a number of bits.
    pub fn skip_bits(&mut self, count: usize) -> CellResult<()> {
        if count > self.bit_len {
            return Err(CellError::NotEnoughBits {
                need: count,
                have: self.bit_len,
            });
        }

        self.bit_offset += count;
        self.bit_len -= count;
        Ok(())
    }

    /// Check if the slice is empty (no bits or refs left).
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs_left() == 0
    }

    fn get_bit_at(&self, index: usize) -> bool {
        let byte_index = index / 8;
        let bit_index = 7 - (index % 8);

        if byte_index < self.cell.data().len() {
            (self.cell.data()[byte_index] >> bit_index) & 1 == 1
        } else {
            false
        }
    }
}
