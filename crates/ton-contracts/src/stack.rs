//! Get-method stack values and positional decoding.
//!
//! A get-method returns a stack that carries no names, only TVM types. The
//! meaning of each position is a convention shared with the on-chain code,
//! so every method used by this crate has a [`GetMethodSpec`] declaring its
//! arguments and return entries. The facades check the returned stack
//! against that signature before decoding it with a [`StackReader`].

use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::error::{ContractError, ContractResult};

/// A single TVM stack entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackValue {
    /// Null value.
    Null,
    /// Integer value (up to 257 bits).
    Int(BigInt),
    /// Cell reference.
    Cell(Arc<Cell>),
    /// Cell slice; the whole cell is the slice.
    Slice(Arc<Cell>),
}

impl StackValue {
    /// Integer entry.
    pub fn int(value: impl Into<BigInt>) -> Self {
        StackValue::Int(value.into())
    }

    /// Boolean entry: TVM encodes true as -1 and false as 0.
    pub fn bool(value: bool) -> Self {
        StackValue::Int(BigInt::from(if value { -1 } else { 0 }))
    }

    /// Slice entry holding an address.
    pub fn address(address: &MsgAddress) -> ContractResult<Self> {
        let mut builder = CellBuilder::new();
        builder.store_address(address)?;
        Ok(StackValue::Slice(Arc::new(builder.build()?)))
    }

    /// Slice entry holding a snake string.
    pub fn string(text: &str) -> ContractResult<Self> {
        let mut builder = CellBuilder::new();
        builder.store_string_tail(text)?;
        Ok(StackValue::Slice(Arc::new(builder.build()?)))
    }

    /// Cell entry.
    pub fn cell(cell: Arc<Cell>) -> Self {
        StackValue::Cell(cell)
    }

    /// TVM type name of the entry.
    pub fn type_name(&self) -> &'static str {
        match self {
            StackValue::Null => "null",
            StackValue::Int(_) => "int",
            StackValue::Cell(_) => "cell",
            StackValue::Slice(_) => "slice",
        }
    }

    /// Returns the entry as an integer, if it is one.
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            StackValue::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the underlying cell of a cell or slice entry.
    pub fn as_cell(&self) -> Option<&Arc<Cell>> {
        match self {
            StackValue::Cell(c) | StackValue::Slice(c) => Some(c),
            _ => None,
        }
    }
}

/// Declared type of a get-method argument or return entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackType {
    /// Integer that fits in 64 bits unsigned.
    Int,
    /// Arbitrary-precision integer.
    BigInt,
    /// Integer used as a flag (-1 / 0).
    Bool,
    /// Slice holding a standard address.
    Address,
    /// Slice holding an address or `addr_none`, or a null entry.
    OptionalAddress,
    /// Slice or cell holding a snake string.
    String,
    /// Cell (a slice is accepted and treated as its cell).
    Cell,
}

impl StackType {
    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            StackType::Int => "int",
            StackType::BigInt => "bigint",
            StackType::Bool => "bool",
            StackType::Address => "address",
            StackType::OptionalAddress => "address?",
            StackType::String => "string",
            StackType::Cell => "cell",
        }
    }

    /// Whether a stack entry has a TVM type this declared type can be read from.
    pub fn accepts(self, value: &StackValue) -> bool {
        match self {
            StackType::Int | StackType::BigInt | StackType::Bool => {
                matches!(value, StackValue::Int(_))
            }
            StackType::Address | StackType::String | StackType::Cell => {
                matches!(value, StackValue::Slice(_) | StackValue::Cell(_))
            }
            StackType::OptionalAddress => !matches!(value, StackValue::Int(_)),
        }
    }
}

impl fmt::Display for StackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed position in a get-method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackField {
    pub name: &'static str,
    pub ty: StackType,
}

impl StackField {
    pub const fn new(name: &'static str, ty: StackType) -> Self {
        Self { name, ty }
    }
}

/// Signature of a get-method: its name, arguments and return entries in
/// stack order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetMethodSpec {
    pub name: &'static str,
    pub args: &'static [StackField],
    pub returns: &'static [StackField],
}

impl GetMethodSpec {
    /// Numeric method id: CRC16-XMODEM of the name with bit 16 set.
    pub fn method_id(&self) -> u32 {
        compute_method_id(self.name)
    }

    /// Check that a returned stack has at least the declared number of
    /// entries and that each declared position has a compatible type.
    pub fn check(&self, stack: &[StackValue]) -> ContractResult<()> {
        if stack.len() < self.returns.len() {
            return Err(ContractError::StackUnderflow {
                method: self.name.to_string(),
                expected: self.returns.len(),
                actual: stack.len(),
            });
        }

        for (position, (field, value)) in self.returns.iter().zip(stack).enumerate() {
            if !field.ty.accepts(value) {
                return Err(ContractError::StackTypeMismatch {
                    method: self.name.to_string(),
                    position,
                    expected: field.ty.name(),
                    actual: value.type_name(),
                });
            }
        }
        Ok(())
    }

    /// Reader over a stack returned by this method.
    pub fn reader<'a>(&self, stack: &'a [StackValue]) -> StackReader<'a> {
        StackReader::new(self.name, stack)
    }
}

/// Compute the numeric id of a get-method from its name.
pub fn compute_method_id(name: &str) -> u32 {
    const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
    (CRC16.checksum(name.as_bytes()) as u32) | 0x10000
}

/// Sequential reader over a get-method result stack.
///
/// Each `read_*` consumes the next entry and fails with a stack underflow
/// when the stack is exhausted or a type mismatch when the entry has the
/// wrong type.
#[derive(Debug, Clone)]
pub struct StackReader<'a> {
    method: &'a str,
    values: &'a [StackValue],
    position: usize,
}

impl<'a> StackReader<'a> {
    /// Create a reader; `method` is used in error messages.
    pub fn new(method: &'a str, values: &'a [StackValue]) -> Self {
        Self {
            method,
            values,
            position: 0,
        }
    }

    /// Number of entries not yet read.
    pub fn remaining(&self) -> usize {
        self.values.len() - self.position
    }

    fn next(&mut self) -> ContractResult<&'a StackValue> {
        let value = self
            .values
            .get(self.position)
            .ok_or_else(|| ContractError::StackUnderflow {
                method: self.method.to_string(),
                expected: self.position + 1,
                actual: self.values.len(),
            })?;
        self.position += 1;
        Ok(value)
    }

    fn mismatch(&self, expected: &'static str, actual: &StackValue) -> ContractError {
        ContractError::StackTypeMismatch {
            method: self.method.to_string(),
            position: self.position - 1,
            expected,
            actual: actual.type_name(),
        }
    }

    /// Read an arbitrary-precision integer.
    pub fn read_big_int(&mut self) -> ContractResult<BigInt> {
        match self.next()? {
            StackValue::Int(n) => Ok(n.clone()),
            other => Err(self.mismatch("bigint", other)),
        }
    }

    /// Read an integer that must fit in `u64`.
    pub fn read_int_u64(&mut self) -> ContractResult<u64> {
        match self.next()? {
            StackValue::Int(n) => n.to_u64().ok_or_else(|| ContractError::StackTypeMismatch {
                method: self.method.to_string(),
                position: self.position - 1,
                expected: "uint64",
                actual: "int",
            }),
            other => Err(self.mismatch("int", other)),
        }
    }

    /// Read a flag: any non-zero integer is true.
    pub fn read_bool(&mut self) -> ContractResult<bool> {
        match self.next()? {
            StackValue::Int(n) => Ok(!n.is_zero()),
            other => Err(self.mismatch("bool", other)),
        }
    }

    /// Read a standard address from a slice entry.
    pub fn read_address(&mut self) -> ContractResult<MsgAddress> {
        let value = self.next()?;
        let Some(cell) = value.as_cell() else {
            return Err(self.mismatch("address", value));
        };
        match CellSlice::new(cell).load_address()? {
            MsgAddress::Null => Err(ContractError::StackTypeMismatch {
                method: self.method.to_string(),
                position: self.position - 1,
                expected: "address",
                actual: "addr_none",
            }),
            addr => Ok(addr),
        }
    }

    /// Read an address that may be absent (null entry or `addr_none`).
    pub fn read_address_opt(&mut self) -> ContractResult<Option<MsgAddress>> {
        match self.next()? {
            StackValue::Null => Ok(None),
            StackValue::Cell(cell) | StackValue::Slice(cell) => {
                Ok(CellSlice::new(cell).load_address_opt()?)
            }
            other => Err(self.mismatch("address?", other)),
        }
    }

    /// Read a snake string from a slice or cell entry.
    pub fn read_string(&mut self) -> ContractResult<String> {
        let value = self.next()?;
        let Some(cell) = value.as_cell() else {
            return Err(self.mismatch("string", value));
        };
        Ok(CellSlice::new(cell).load_string_tail()?)
    }

    /// Read a cell (a slice entry yields its cell).
    pub fn read_cell(&mut self) -> ContractResult<Arc<Cell>> {
        let value = self.next()?;
        value
            .as_cell()
            .cloned()
            .ok_or_else(|| self.mismatch("cell", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: GetMethodSpec = GetMethodSpec {
        name: "get_sample",
        args: &[],
        returns: &[
            StackField::new("count", StackType::Int),
            StackField::new("label", StackType::String),
            StackField::new("enabled", StackType::Bool),
        ],
    };

    #[test]
    fn test_bool_encoding() {
        assert_eq!(StackValue::bool(true), StackValue::int(-1));
        assert_eq!(StackValue::bool(false), StackValue::int(0));
    }

    #[test]
    fn test_method_id() {
        // Well-known id of the `seqno` get-method.
        assert_eq!(compute_method_id("seqno"), 85143);
    }

    #[test]
    fn test_check_underflow() {
        let stack = vec![StackValue::int(1)];
        match SAMPLE.check(&stack) {
            Err(ContractError::StackUnderflow {
                method,
                expected,
                actual,
            }) => {
                assert_eq!(method, "get_sample");
                assert_eq!(expected, 3);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_check_type_mismatch() {
        let stack = vec![
            StackValue::int(1),
            StackValue::int(2),
            StackValue::bool(true),
        ];
        assert!(matches!(
            SAMPLE.check(&stack),
            Err(ContractError::StackTypeMismatch {
                position: 1,
                expected: "string",
                actual: "int",
                ..
            })
        ));
    }

    #[test]
    fn test_reader_sequence() {
        let stack = vec![
            StackValue::int(7),
            StackValue::string("label").unwrap(),
            StackValue::bool(true),
        ];
        SAMPLE.check(&stack).unwrap();

        let mut reader = SAMPLE.reader(&stack);
        assert_eq!(reader.read_int_u64().unwrap(), 7);
        assert_eq!(reader.read_string().unwrap(), "label");
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.remaining(), 0);
        assert!(matches!(
            reader.read_cell(),
            Err(ContractError::StackUnderflow { expected: 4, .. })
        ));
    }

    #[test]
    fn test_read_int_u64_rejects_negative() {
        let stack = vec![StackValue::int(-5)];
        let mut reader = StackReader::new("m", &stack);
        assert!(matches!(
            reader.read_int_u64(),
            Err(ContractError::StackTypeMismatch {
                expected: "uint64",
                ..
            })
        ));
    }

    #[test]
    fn test_read_addresses() {
        let addr = MsgAddress::internal(0, [7; 32]);
        let stack = vec![
            StackValue::address(&addr).unwrap(),
            StackValue::Null,
            StackValue::address(&MsgAddress::Null).unwrap(),
            StackValue::address(&MsgAddress::Null).unwrap(),
        ];
        let mut reader = StackReader::new("m", &stack);
        assert_eq!(reader.read_address().unwrap(), addr);
        assert_eq!(reader.read_address_opt().unwrap(), None);
        assert_eq!(reader.read_address_opt().unwrap(), None);
        assert!(matches!(
            reader.read_address(),
            Err(ContractError::StackTypeMismatch {
                position: 3,
                actual: "addr_none",
                ..
            })
        ));
    }

    #[test]
    fn test_read_bool_from_cell_fails() {
        let stack = vec![StackValue::cell(Arc::new(Cell::empty()))];
        let mut reader = StackReader::new("m", &stack);
        assert!(matches!(
            reader.read_bool(),
            Err(ContractError::StackTypeMismatch {
                position: 0,
                expected: "bool",
                actual: "cell",
                ..
            })
        ));
    }
}
