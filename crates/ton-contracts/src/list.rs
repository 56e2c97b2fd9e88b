//! Reference-tree layout for variable-length entry lists.
//!
//! Batch operations carry each list entry as its own finalized cell. Up to
//! four entries fit in a single wrapper cell as references. Longer lists
//! chain wrappers: each non-final wrapper holds three entries and a
//! continuation wrapper as its fourth reference, and the final wrapper
//! holds the remaining one to four entries.
//!
//! Wrappers never carry data bits and entries always do, which is how a
//! reader tells a continuation from an entry.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, MAX_CELL_REFS};

use crate::error::{ContractError, ContractResult};

/// Entries held by a wrapper that also links to a continuation.
const ENTRIES_PER_LINK: usize = MAX_CELL_REFS - 1;

/// Pack entry cells into a wrapper tree and return its root.
pub fn build_ref_list(entries: &[Arc<Cell>]) -> ContractResult<Cell> {
    if entries.is_empty() {
        return Err(ContractError::EmptyList);
    }
    if let Some(position) = entries.iter().position(|e| e.bit_len() == 0) {
        return Err(ContractError::InvalidRefList(format!(
            "entry {} has no data bits",
            position
        )));
    }

    let links = if entries.len() <= MAX_CELL_REFS {
        0
    } else {
        (entries.len() - MAX_CELL_REFS).div_ceil(ENTRIES_PER_LINK)
    };

    let mut tail = wrap(&entries[links * ENTRIES_PER_LINK..], None)?;
    for link in (0..links).rev() {
        let start = link * ENTRIES_PER_LINK;
        tail = wrap(
            &entries[start..start + ENTRIES_PER_LINK],
            Some(Arc::new(tail)),
        )?;
    }
    Ok(tail)
}

fn wrap(entries: &[Arc<Cell>], next: Option<Arc<Cell>>) -> ContractResult<Cell> {
    let mut builder = CellBuilder::new();
    for entry in entries {
        builder.store_ref(entry.clone())?;
    }
    if let Some(next) = next {
        builder.store_ref(next)?;
    }
    Ok(builder.build()?)
}

/// Walk a wrapper tree and return the entries in order.
pub fn parse_ref_list(root: &Cell) -> ContractResult<Vec<Arc<Cell>>> {
    let mut entries = Vec::new();
    let mut wrapper = root;

    loop {
        if wrapper.bit_len() != 0 {
            return Err(ContractError::InvalidRefList(format!(
                "wrapper holds {} data bits",
                wrapper.bit_len()
            )));
        }

        let refs = wrapper.references();
        let continuation = match refs.last() {
            None => {
                return Err(ContractError::InvalidRefList("empty wrapper".to_string()));
            }
            Some(last) if refs.len() == MAX_CELL_REFS && last.bit_len() == 0 => Some(last),
            Some(_) => None,
        };

        let entry_count = refs.len() - usize::from(continuation.is_some());
        for entry in &refs[..entry_count] {
            if entry.bit_len() == 0 {
                return Err(ContractError::InvalidRefList(
                    "entry has no data bits".to_string(),
                ));
            }
            entries.push(entry.clone());
        }

        match continuation {
            Some(next) => wrapper = next,
            None => return Ok(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: u32) -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u32(i).unwrap();
        Arc::new(builder.build().unwrap())
    }

    fn entries(n: u32) -> Vec<Arc<Cell>> {
        (0..n).map(entry).collect()
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(build_ref_list(&[]), Err(ContractError::EmptyList)));
    }

    #[test]
    fn test_small_list_single_wrapper() {
        for n in 1..=4 {
            let list = entries(n);
            let root = build_ref_list(&list).unwrap();
            assert_eq!(root.bit_len(), 0);
            assert_eq!(root.reference_count(), n as usize);
            assert_eq!(parse_ref_list(&root).unwrap(), list);
        }
    }

    #[test]
    fn test_five_entries_chain_once() {
        let list = entries(5);
        let root = build_ref_list(&list).unwrap();
        assert_eq!(root.reference_count(), 4);
        let next = root.reference(3).unwrap();
        assert_eq!(next.bit_len(), 0);
        assert_eq!(next.reference_count(), 2);
        assert_eq!(parse_ref_list(&root).unwrap(), list);
    }

    #[test]
    fn test_long_lists_roundtrip() {
        for n in [6, 7, 8, 10, 31, 100] {
            let list = entries(n);
            let root = build_ref_list(&list).unwrap();
            assert_eq!(parse_ref_list(&root).unwrap(), list, "n = {n}");
        }
    }

    #[test]
    fn test_final_wrapper_uses_four_slots() {
        // 7 = 3 + 4: one link, final wrapper full of entries
        let root = build_ref_list(&entries(7)).unwrap();
        let last = root.reference(3).unwrap();
        assert_eq!(last.reference_count(), 4);
        assert!(last.references().iter().all(|e| e.bit_len() > 0));
    }

    #[test]
    fn test_entry_without_bits_rejected() {
        let list = vec![entry(1), Arc::new(Cell::empty())];
        assert!(matches!(
            build_ref_list(&list),
            Err(ContractError::InvalidRefList(_))
        ));
    }

    #[test]
    fn test_parse_rejects_data_in_wrapper() {
        assert!(parse_ref_list(&entry(1)).is_err());
        assert!(parse_ref_list(&Cell::empty()).is_err());
    }
}
