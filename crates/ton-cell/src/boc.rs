//! Bag of Cells (BoC) serialization format.
//!
//! Cells are written parents first: every reference index points to a later
//! cell, the first root is cell 0, and identical subtrees are stored once.
//! Serialization always uses the generic `b5ee9c72` header with a CRC32C
//! trailer. Deserialization accepts the generic header with or without CRC
//! and rejects exotic cells.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{
    BOC_GENERIC_MAGIC, Cell, CellError, CellResult, HASH_BYTES, MAX_CELL_BITS, MAX_CELL_DEPTH,
    MAX_CELL_REFS, crc32c,
};

const FLAG_HAS_IDX: u8 = 0x80;
const FLAG_HAS_CRC: u8 = 0x40;
const FLAG_HAS_CACHE_BITS: u8 = 0x20;

/// Bag of Cells: one or more root cells and everything they reference.
///
/// # Example
///
/// ```
/// use ton_cell::{BagOfCells, CellBuilder};
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(42).unwrap();
/// let cell = builder.build().unwrap();
/// let hash = cell.hash();
///
/// let encoded = BagOfCells::from_root(cell).serialize_to_base64().unwrap();
/// let decoded = BagOfCells::deserialize_from_base64(&encoded).unwrap();
/// assert_eq!(decoded.single_root().unwrap().hash(), hash);
/// ```
#[derive(Debug, Clone)]
pub struct BagOfCells {
    roots: Vec<Arc<Cell>>,
}

/// A cell as read from the wire, before its references are resolved.
struct RawCell<'a> {
    data: &'a [u8],
    bit_len: usize,
    refs: Vec<usize>,
}

impl BagOfCells {
    /// Create a new BoC with the given root cells.
    pub fn new(roots: Vec<Arc<Cell>>) -> Self {
        BagOfCells { roots }
    }

    /// Create a BoC with a single root cell.
    pub fn from_root(root: Cell) -> Self {
        BagOfCells {
            roots: vec![Arc::new(root)],
        }
    }

    /// Get all root cells.
    pub fn roots(&self) -> &[Arc<Cell>] {
        &self.roots
    }

    /// Get a single root cell (errors if not exactly one root).
    pub fn single_root(&self) -> CellResult<&Arc<Cell>> {
        if self.roots.len() != 1 {
            return Err(CellError::NotSingleRoot(self.roots.len()));
        }
        Ok(&self.roots[0])
    }

    /// Consume the BoC and return its only root.
    pub fn into_single_root(mut self) -> CellResult<Arc<Cell>> {
        if self.roots.len() != 1 {
            return Err(CellError::NotSingleRoot(self.roots.len()));
        }
        self.roots.pop().ok_or(CellError::NotSingleRoot(0))
    }

    /// Serialize to bytes: generic header, no index, CRC32C trailer.
    pub fn serialize(&self) -> CellResult<Vec<u8>> {
        if self.roots.is_empty() {
            return Err(CellError::InvalidBoc("No root cells".to_string()));
        }

        let cells = self.collect_cells();
        let index: HashMap<[u8; HASH_BYTES], usize> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash(), i))
            .collect();

        let size_bytes = bytes_needed(cells.len());

        let mut cell_data = Vec::new();
        for cell in &cells {
            let (d1, d2) = cell.descriptors();
            cell_data.push(d1);
            cell_data.push(d2);
            cell_data.extend_from_slice(&cell.data_with_completion_tag());
            for reference in cell.references() {
                let idx = index
                    .get(&reference.hash())
                    .ok_or_else(|| CellError::InvalidBoc("Reference not found".to_string()))?;
                write_uint(&mut cell_data, *idx as u64, size_bytes);
            }
        }

        let off_bytes = bytes_needed(cell_data.len());

        let mut result = Vec::with_capacity(16 + cell_data.len());
        result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());
        result.push(FLAG_HAS_CRC | size_bytes as u8);
        result.push(off_bytes as u8);
        write_uint(&mut result, cells.len() as u64, size_bytes);
        write_uint(&mut result, self.roots.len() as u64, size_bytes);
        write_uint(&mut result, 0, size_bytes);
        write_uint(&mut result, cell_data.len() as u64, off_bytes);
        for root in &self.roots {
            let idx = index
                .get(&root.hash())
                .ok_or_else(|| CellError::InvalidBoc("Root not found".to_string()))?;
            write_uint(&mut result, *idx as u64, size_bytes);
        }
        result.extend_from_slice(&cell_data);

        let crc = crc32c(&result);
        result.extend_from_slice(&crc.to_le_bytes());

        Ok(result)
    }

    /// Serialize to a standard base64 string.
    pub fn serialize_to_base64(&self) -> CellResult<String> {
        Ok(STANDARD.encode(self.serialize()?))
    }

    /// Deserialize from bytes.
    pub fn deserialize(data: &[u8]) -> CellResult<Self> {
        let mut reader = Reader { data, offset: 0 };

        let magic = reader.read_uint(4)? as u32;
        if magic != BOC_GENERIC_MAGIC {
            return Err(CellError::InvalidBoc(format!(
                "Invalid magic: {:08x}, expected {:08x}",
                magic, BOC_GENERIC_MAGIC
            )));
        }

        let flags = reader.read_uint(1)? as u8;
        let has_idx = flags & FLAG_HAS_IDX != 0;
        let has_crc = flags & FLAG_HAS_CRC != 0;
        let size_bytes = (flags & 0x07) as usize;
        if flags & FLAG_HAS_CACHE_BITS != 0 {
            return Err(CellError::InvalidBoc("cache bits are not supported".into()));
        }
        if !(1..=4).contains(&size_bytes) {
            return Err(CellError::InvalidBoc(format!(
                "invalid size_bytes: {}",
                size_bytes
            )));
        }

        let off_bytes = reader.read_uint(1)? as usize;
        if !(1..=8).contains(&off_bytes) {
            return Err(CellError::InvalidBoc(format!(
                "invalid off_bytes: {}",
                off_bytes
            )));
        }

        let payload_end = if has_crc {
            let end = data.len().checked_sub(4).ok_or(CellError::UnexpectedEof)?;
            let expected = u32::from_le_bytes([
                data[end],
                data[end + 1],
                data[end + 2],
                data[end + 3],
            ]);
            let actual = crc32c(&data[..end]);
            if expected != actual {
                return Err(CellError::CrcMismatch { expected, actual });
            }
            end
        } else {
            data.len()
        };
        reader.data = &data[..payload_end];

        let cells_count = reader.read_uint(size_bytes)? as usize;
        let roots_count = reader.read_uint(size_bytes)? as usize;
        let absent_count = reader.read_uint(size_bytes)? as usize;
        let total_cells_size = reader.read_uint(off_bytes)? as usize;

        if cells_count == 0 || roots_count == 0 || roots_count > cells_count {
            return Err(CellError::InvalidBoc(format!(
                "{} cells, {} roots",
                cells_count, roots_count
            )));
        }
        // Header counts are untrusted: bound them by the input before allocating.
        let index_len = if has_idx {
            cells_count.checked_mul(off_bytes)
        } else {
            Some(0)
        };
        let needed = roots_count
            .checked_mul(size_bytes)
            .zip(index_len)
            .and_then(|(roots_len, index_len)| roots_len.checked_add(index_len))
            .and_then(|len| len.checked_add(total_cells_size));
        if needed.is_none_or(|len| len > reader.remaining()) {
            return Err(CellError::InvalidBoc(format!(
                "header declares {} cells, {} roots and {} data bytes, {} bytes available",
                cells_count,
                roots_count,
                total_cells_size,
                reader.remaining()
            )));
        }
        if cells_count > total_cells_size / 2 {
            return Err(CellError::InvalidBoc(format!(
                "{} cells cannot fit in {} bytes",
                cells_count, total_cells_size
            )));
        }
        if absent_count != 0 {
            return Err(CellError::InvalidBoc("absent cells are not supported".into()));
        }

        let mut root_indices = Vec::with_capacity(roots_count);
        for _ in 0..roots_count {
            root_indices.push(reader.read_uint(size_bytes)? as usize);
        }

        if has_idx {
            reader.skip(cells_count * off_bytes)?;
        }

        let cells_data = reader.take(total_cells_size)?;
        let cells = parse_cells(cells_data, cells_count, size_bytes)?;

        let roots = root_indices
            .iter()
            .map(|&idx| cells.get(idx).cloned().ok_or(CellError::CellNotFound(idx)))
            .collect::<CellResult<Vec<_>>>()?;

        Ok(BagOfCells { roots })
    }

    /// Deserialize from a standard base64 string.
    pub fn deserialize_from_base64(base64_str: &str) -> CellResult<Self> {
        let bytes = STANDARD
            .decode(base64_str.trim())
            .map_err(|e| CellError::InvalidBase64(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Unique cells in parent-before-child order, first root at index 0.
    fn collect_cells(&self) -> Vec<Arc<Cell>> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();

        for root in self.roots.iter().rev() {
            visit(root, &mut order, &mut visited);
        }

        order.reverse();
        order
    }
}

/// Post-order walk with children visited last-to-first; reversing the
/// output puts every parent ahead of its children.
fn visit(
    cell: &Arc<Cell>,
    order: &mut Vec<Arc<Cell>>,
    visited: &mut HashSet<[u8; HASH_BYTES]>,
) {
    if !visited.insert(cell.hash()) {
        return;
    }
    for reference in cell.references().iter().rev() {
        visit(reference, order, visited);
    }
    order.push(cell.clone());
}

fn parse_cells(data: &[u8], cells_count: usize, size_bytes: usize) -> CellResult<Vec<Arc<Cell>>> {
    let mut reader = Reader { data, offset: 0 };
    let mut raw = Vec::with_capacity(cells_count);

    for index in 0..cells_count {
        let d1 = reader.read_uint(1)? as u8;
        let d2 = reader.read_uint(1)? as usize;

        if d1 & 0x08 != 0 {
            return Err(CellError::ExoticCell);
        }
        if d1 & 0x10 != 0 || d1 >> 5 != 0 {
            return Err(CellError::InvalidBoc(format!(
                "unsupported cell descriptor {:02x}",
                d1
            )));
        }

        let refs_count = (d1 & 0x07) as usize;
        if refs_count > MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(refs_count));
        }

        let data_len = d2.div_ceil(2);
        let cell_data = reader.take(data_len)?;
        let bit_len = if d2 % 2 == 0 {
            data_len * 8
        } else {
            let last = cell_data[data_len - 1];
            if last == 0 {
                return Err(CellError::InvalidBoc("missing completion tag".into()));
            }
            data_len * 8 - 1 - last.trailing_zeros() as usize
        };
        if bit_len > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(bit_len));
        }

        let mut refs = Vec::with_capacity(refs_count);
        for _ in 0..refs_count {
            let target = reader.read_uint(size_bytes)? as usize;
            if target <= index || target >= cells_count {
                return Err(CellError::InvalidBoc(format!(
                    "cell {} references cell {}",
                    index, target
                )));
            }
            refs.push(target);
        }

        raw.push(RawCell {
            data: cell_data,
            bit_len,
            refs,
        });
    }

    // References always point forward, so build from the end.
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cells_count];
    for (index, cell) in raw.into_iter().enumerate().rev() {
        let references = cell
            .refs
            .iter()
            .map(|&r| built[r].clone().ok_or(CellError::CellNotFound(r)))
            .collect::<CellResult<Vec<_>>>()?;

        let mut bytes = cell.data.to_vec();
        bytes.truncate(cell.bit_len.div_ceil(8));
        if cell.bit_len % 8 != 0
            && let Some(last) = bytes.last_mut()
        {
            *last &= 0xFFu8 << (8 - cell.bit_len % 8);
        }

        let built_cell = Cell::new(bytes, cell.bit_len, references);
        if built_cell.depth() > MAX_CELL_DEPTH {
            return Err(CellError::DepthTooLarge(built_cell.depth() as usize));
        }
        built[index] = Some(Arc::new(built_cell));
    }

    built
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.ok_or(CellError::CellNotFound(i)))
        .collect()
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> CellResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(CellError::UnexpectedEof)?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn skip(&mut self, len: usize) -> CellResult<()> {
        self.take(len).map(|_| ())
    }

    fn read_uint(&mut self, len: usize) -> CellResult<u64> {
        Ok(self
            .take(len)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }
}

/// Minimum number of bytes needed to represent `value`.
fn bytes_needed(value: usize) -> usize {
    let bits = usize::BITS - value.leading_zeros();
    (bits as usize).div_ceil(8).max(1)
}

fn write_uint(buf: &mut Vec<u8>, value: u64, bytes: usize) {
    for i in (0..bytes).rev() {
        buf.push((value >> (i * 8)) as u8);
    }
}
