//! Compiled code artifacts, state init and address derivation.

use std::sync::Arc;

use ton_cell::{BagOfCells, Cell, CellBuilder, HASH_BYTES, MsgAddress};

use crate::error::{ContractError, ContractResult};
use crate::kind::ContractKind;

/// Compiled contract code for one contract kind.
///
/// Code is produced by the contract toolchain and shipped as a BoC; this
/// crate only loads it and never synthesizes bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCode {
    /// Contract kind the code implements.
    pub kind: ContractKind,
    /// Artifact version label, e.g. a release tag or toolchain build id.
    pub version: String,
    /// Root code cell.
    pub cell: Arc<Cell>,
}

impl ContractCode {
    /// Wrap an already decoded code cell.
    pub fn new(kind: ContractKind, version: impl Into<String>, cell: Arc<Cell>) -> Self {
        Self {
            kind,
            version: version.into(),
            cell,
        }
    }

    /// Load code from BoC bytes with a single root.
    pub fn from_boc(
        kind: ContractKind,
        version: impl Into<String>,
        boc: &[u8],
    ) -> ContractResult<Self> {
        let cell = BagOfCells::deserialize(boc)?.into_single_root()?;
        Ok(Self::new(kind, version, cell))
    }

    /// Load code from a base64 BoC.
    pub fn from_base64(
        kind: ContractKind,
        version: impl Into<String>,
        boc: &str,
    ) -> ContractResult<Self> {
        let cell = BagOfCells::deserialize_from_base64(boc)?.into_single_root()?;
        Ok(Self::new(kind, version, cell))
    }

    /// Representation hash of the code cell.
    pub fn hash(&self) -> [u8; HASH_BYTES] {
        self.cell.hash()
    }

    /// Fail unless the code implements `expected`.
    pub fn ensure_kind(&self, expected: ContractKind) -> ContractResult<()> {
        if self.kind != expected {
            return Err(ContractError::CodeKindMismatch {
                expected,
                actual: self.kind,
            });
        }
        Ok(())
    }
}

/// Code and initial data of a contract that may not be deployed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInit {
    pub code: Arc<Cell>,
    pub data: Arc<Cell>,
}

impl ContractInit {
    pub fn new(code: Arc<Cell>, data: Arc<Cell>) -> Self {
        Self { code, data }
    }

    /// StateInit cell:
    /// `split_depth:(Maybe) special:(Maybe) code:(Maybe ^Cell) data:(Maybe ^Cell) library:(Maybe)`
    /// with code and data present and everything else absent.
    pub fn state_init(&self) -> ContractResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_bit(false)?;
        builder.store_bit(false)?;
        builder.store_maybe_ref(Some(self.code.clone()))?;
        builder.store_maybe_ref(Some(self.data.clone()))?;
        builder.store_bit(false)?;
        Ok(builder.build()?)
    }

    /// Address the contract will have once deployed: the StateInit hash in
    /// the given workchain.
    pub fn address(&self, workchain: i32) -> ContractResult<MsgAddress> {
        Ok(MsgAddress::Internal {
            workchain,
            address: self.state_init()?.hash(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_with(value: u32) -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u32(value).unwrap();
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_state_init_layout() {
        let init = ContractInit::new(cell_with(1), cell_with(2));
        let state_init = init.state_init().unwrap();
        assert_eq!(state_init.to_bit_string(), "00110");
        assert_eq!(state_init.reference_count(), 2);
        assert_eq!(state_init.reference(0).unwrap().hash(), init.code.hash());
        assert_eq!(state_init.reference(1).unwrap().hash(), init.data.hash());
    }

    #[test]
    fn test_address_is_deterministic() {
        let a = ContractInit::new(cell_with(1), cell_with(2));
        let b = ContractInit::new(cell_with(1), cell_with(2));
        let c = ContractInit::new(cell_with(1), cell_with(3));

        assert_eq!(a.address(0).unwrap(), b.address(0).unwrap());
        assert_ne!(a.address(0).unwrap(), c.address(0).unwrap());
        assert_eq!(a.address(-1).unwrap().workchain(), Some(-1));
    }

    #[test]
    fn test_code_from_base64() {
        let cell = cell_with(0xC0DE);
        let boc = BagOfCells::new(vec![cell.clone()])
            .serialize_to_base64()
            .unwrap();

        let code = ContractCode::from_base64(ContractKind::FanClub, "v1", &boc).unwrap();
        assert_eq!(code.hash(), cell.hash());
        assert_eq!(code.version, "v1");
        code.ensure_kind(ContractKind::FanClub).unwrap();
        assert!(matches!(
            code.ensure_kind(ContractKind::Payment),
            Err(ContractError::CodeKindMismatch {
                expected: ContractKind::Payment,
                actual: ContractKind::FanClub,
            })
        ));
    }

    #[test]
    fn test_code_from_invalid_boc() {
        assert!(ContractCode::from_boc(ContractKind::NftItem, "v1", &[0, 1, 2]).is_err());
    }
}
