//! Contract kinds and the operation table.

use std::fmt;

use serde::{Deserialize, Serialize};
use ton_cell::Cell;

use crate::error::ContractResult;
use crate::fan_club::{self, FanClubOperation};
use crate::nft_collection::{self, NftCollectionOperation};
use crate::nft_item::{self, NftItemOperation};
use crate::payment::{self, PaymentOperation};
use crate::reward_distributor::{self, RewardDistributorOperation};
use crate::stack::GetMethodSpec;

/// The contract kinds this crate knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    NftCollection,
    NftItem,
    FanClub,
    Payment,
    RewardDistributor,
}

impl ContractKind {
    /// All kinds.
    pub const ALL: [ContractKind; 5] = [
        ContractKind::NftCollection,
        ContractKind::NftItem,
        ContractKind::FanClub,
        ContractKind::Payment,
        ContractKind::RewardDistributor,
    ];

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            ContractKind::NftCollection => "nft_collection",
            ContractKind::NftItem => "nft_item",
            ContractKind::FanClub => "fan_club",
            ContractKind::Payment => "payment",
            ContractKind::RewardDistributor => "reward_distributor",
        }
    }

    /// Get-methods the kind exposes, with their stack signatures.
    pub fn get_methods(self) -> &'static [GetMethodSpec] {
        match self {
            ContractKind::NftCollection => nft_collection::GET_METHODS,
            ContractKind::NftItem => nft_item::GET_METHODS,
            ContractKind::FanClub => fan_club::GET_METHODS,
            ContractKind::Payment => payment::GET_METHODS,
            ContractKind::RewardDistributor => reward_distributor::GET_METHODS,
        }
    }

    /// Look up a get-method by name.
    pub fn get_method(self, name: &str) -> Option<&'static GetMethodSpec> {
        self.get_methods().iter().find(|spec| spec.name == name)
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any operation message of any contract kind.
#[derive(Debug, Clone)]
pub enum ContractOperation {
    NftCollection(NftCollectionOperation),
    NftItem(NftItemOperation),
    FanClub(FanClubOperation),
    Payment(PaymentOperation),
    RewardDistributor(RewardDistributorOperation),
}

impl ContractOperation {
    /// Kind of contract the operation is addressed to.
    pub fn kind(&self) -> ContractKind {
        match self {
            ContractOperation::NftCollection(_) => ContractKind::NftCollection,
            ContractOperation::NftItem(_) => ContractKind::NftItem,
            ContractOperation::FanClub(_) => ContractKind::FanClub,
            ContractOperation::Payment(_) => ContractKind::Payment,
            ContractOperation::RewardDistributor(_) => ContractKind::RewardDistributor,
        }
    }

    /// 32-bit opcode that leads the message body.
    pub fn opcode(&self) -> u32 {
        match self {
            ContractOperation::NftCollection(op) => op.opcode(),
            ContractOperation::NftItem(op) => op.opcode(),
            ContractOperation::FanClub(op) => op.opcode(),
            ContractOperation::Payment(op) => op.opcode(),
            ContractOperation::RewardDistributor(op) => op.opcode(),
        }
    }

    /// Encode the message body.
    pub fn build_body(&self) -> ContractResult<Cell> {
        match self {
            ContractOperation::NftCollection(op) => op.build_body(),
            ContractOperation::NftItem(op) => op.build_body(),
            ContractOperation::FanClub(op) => op.build_body(),
            ContractOperation::Payment(op) => op.build_body(),
            ContractOperation::RewardDistributor(op) => op.build_body(),
        }
    }
}

impl From<NftCollectionOperation> for ContractOperation {
    fn from(op: NftCollectionOperation) -> Self {
        ContractOperation::NftCollection(op)
    }
}

impl From<NftItemOperation> for ContractOperation {
    fn from(op: NftItemOperation) -> Self {
        ContractOperation::NftItem(op)
    }
}

impl From<FanClubOperation> for ContractOperation {
    fn from(op: FanClubOperation) -> Self {
        ContractOperation::FanClub(op)
    }
}

impl From<PaymentOperation> for ContractOperation {
    fn from(op: PaymentOperation) -> Self {
        ContractOperation::Payment(op)
    }
}

impl From<RewardDistributorOperation> for ContractOperation {
    fn from(op: RewardDistributorOperation) -> Self {
        ContractOperation::RewardDistributor(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use ton_cell::CellSlice;

    use crate::fan_club::WithdrawParams;
    use crate::nft_item::GetStaticDataParams;

    #[test]
    fn test_every_kind_has_get_methods() {
        for kind in ContractKind::ALL {
            assert!(!kind.get_methods().is_empty(), "{kind} has no get-methods");
        }
    }

    #[test]
    fn test_get_method_names_unique_per_kind() {
        for kind in ContractKind::ALL {
            let names: HashSet<_> = kind.get_methods().iter().map(|m| m.name).collect();
            assert_eq!(names.len(), kind.get_methods().len());
        }
    }

    #[test]
    fn test_get_method_lookup() {
        let spec = ContractKind::FanClub.get_method("get_membership_info").unwrap();
        assert_eq!(spec.args.len(), 1);
        assert_eq!(spec.returns.len(), 3);
        assert!(ContractKind::FanClub.get_method("get_collection_data").is_none());
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&ContractKind::RewardDistributor).unwrap();
        assert_eq!(json, "\"reward_distributor\"");
        let kind: ContractKind = serde_json::from_str("\"nft_item\"").unwrap();
        assert_eq!(kind, ContractKind::NftItem);
    }

    #[test]
    fn test_operation_dispatch() {
        let ops: Vec<ContractOperation> = vec![
            FanClubOperation::Withdraw(WithdrawParams {
                query_id: None,
                amount: 1,
            })
            .into(),
            NftItemOperation::GetStaticData(GetStaticDataParams { query_id: Some(9) }).into(),
        ];

        assert_eq!(ops[0].kind(), ContractKind::FanClub);
        assert_eq!(ops[1].kind(), ContractKind::NftItem);

        for op in &ops {
            let body = op.build_body().unwrap();
            let mut slice = CellSlice::new(&body);
            assert_eq!(slice.load_u32().unwrap(), op.opcode());
        }
    }
}
