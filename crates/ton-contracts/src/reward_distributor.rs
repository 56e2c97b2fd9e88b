//! Reward distributor contract.
//!
//! Holds a reward pool that the owner tops up and distributes in batches;
//! users claim accumulated rewards against an activity proof.

use std::sync::Arc;

use num_bigint::BigInt;
use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::contract::{ContractBinding, begin_message};
use crate::error::ContractResult;
use crate::init::{ContractCode, ContractInit};
use crate::kind::ContractKind;
use crate::list::build_ref_list;
use crate::settings::ContractSettings;
use crate::stack::{GetMethodSpec, StackField, StackType, StackValue};
use crate::transport::ContractTransport;

pub mod opcodes {
    pub const ADD_REWARDS: u32 = 1;
    pub const CLAIM_REWARDS: u32 = 2;
    pub const DISTRIBUTE_REWARDS: u32 = 3;
    pub const UPDATE_CONFIG: u32 = 4;
}

/// `get_user_rewards(user) -> (pending, total_claimed, last_claim_at)`
pub const GET_USER_REWARDS: GetMethodSpec = GetMethodSpec {
    name: "get_user_rewards",
    args: &[StackField::new("user", StackType::Address)],
    returns: &[
        StackField::new("pending", StackType::BigInt),
        StackField::new("total_claimed", StackType::BigInt),
        StackField::new("last_claim_at", StackType::Int),
    ],
};

/// `get_distributor_info() -> (reward_pool, distribution_period, min_claim_amount)`
pub const GET_DISTRIBUTOR_INFO: GetMethodSpec = GetMethodSpec {
    name: "get_distributor_info",
    args: &[],
    returns: &[
        StackField::new("reward_pool", StackType::BigInt),
        StackField::new("distribution_period", StackType::Int),
        StackField::new("min_claim_amount", StackType::BigInt),
    ],
};

pub(crate) const GET_METHODS: &[GetMethodSpec] = &[GET_USER_REWARDS, GET_DISTRIBUTOR_INFO];

/// Initial data of a distributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardDistributorConfig {
    pub owner: MsgAddress,
    pub reward_pool: u128,
    /// Seconds between distributions.
    pub distribution_period: u32,
    pub min_claim_amount: u128,
}

impl RewardDistributorConfig {
    /// `owner reward_pool:Coins distribution_period:uint32 min_claim_amount:Coins`
    pub fn to_cell(&self) -> ContractResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_address(&self.owner)?;
        builder.store_coins(self.reward_pool)?;
        builder.store_u32(self.distribution_period)?;
        builder.store_coins(self.min_claim_amount)?;
        Ok(builder.build()?)
    }

    pub fn from_cell(cell: &Cell) -> ContractResult<Self> {
        let mut slice = CellSlice::new(cell);
        Ok(Self {
            owner: slice.load_address()?,
            reward_pool: slice.load_coins()?,
            distribution_period: slice.load_u32()?,
            min_claim_amount: slice.load_coins()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddRewardsParams {
    pub query_id: Option<u64>,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRewardsParams {
    pub query_id: Option<u64>,
    pub claimant: MsgAddress,
    pub amount: u128,
    /// Off-chain attestation of the claimant's activity, checked on-chain.
    pub activity_proof: Arc<Cell>,
}

/// One recipient of a batch distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardEntry {
    pub recipient: MsgAddress,
    pub amount: u128,
    pub reward_type: String,
}

impl RewardEntry {
    /// `recipient amount:Coins reward_type:tail`
    pub fn to_cell(&self) -> ContractResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_address(&self.recipient)?;
        builder.store_coins(self.amount)?;
        builder.store_string_tail(&self.reward_type)?;
        Ok(builder.build()?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributeRewardsParams {
    pub query_id: Option<u64>,
    pub rewards: Vec<RewardEntry>,
}

/// Fields left as `None` are written as zero, which the contract reads as
/// "unchanged".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateConfigParams {
    pub query_id: Option<u64>,
    pub new_period: Option<u32>,
    pub new_min_claim_amount: Option<u128>,
}

/// Messages accepted by the distributor.
#[derive(Debug, Clone)]
pub enum RewardDistributorOperation {
    AddRewards(AddRewardsParams),
    ClaimRewards(ClaimRewardsParams),
    DistributeRewards(DistributeRewardsParams),
    UpdateConfig(UpdateConfigParams),
}

impl RewardDistributorOperation {
    pub fn opcode(&self) -> u32 {
        match self {
            RewardDistributorOperation::AddRewards(_) => opcodes::ADD_REWARDS,
            RewardDistributorOperation::ClaimRewards(_) => opcodes::CLAIM_REWARDS,
            RewardDistributorOperation::DistributeRewards(_) => opcodes::DISTRIBUTE_REWARDS,
            RewardDistributorOperation::UpdateConfig(_) => opcodes::UPDATE_CONFIG,
        }
    }

    /// Encode the message body.
    ///
    /// ```text
    /// add_rewards#00000001 query_id:uint64 amount:Coins
    /// claim_rewards#00000002 query_id:uint64 claimant:MsgAddress amount:Coins ^proof
    /// distribute_rewards#00000003 query_id:uint64 ^(list of ^[recipient amount:Coins reward_type:tail])
    /// update_config#00000004 query_id:uint64 new_period:uint32 new_min_claim_amount:Coins
    /// ```
    pub fn build_body(&self) -> ContractResult<Cell> {
        let builder = match self {
            RewardDistributorOperation::AddRewards(params) => {
                let mut builder = begin_message(opcodes::ADD_REWARDS, params.query_id)?;
                builder.store_coins(params.amount)?;
                builder
            }
            RewardDistributorOperation::ClaimRewards(params) => {
                let mut builder = begin_message(opcodes::CLAIM_REWARDS, params.query_id)?;
                builder.store_address(&params.claimant)?;
                builder.store_coins(params.amount)?;
                builder.store_ref(params.activity_proof.clone())?;
                builder
            }
            RewardDistributorOperation::DistributeRewards(params) => {
                let entries = params
                    .rewards
                    .iter()
                    .map(|entry| Ok(Arc::new(entry.to_cell()?)))
                    .collect::<ContractResult<Vec<_>>>()?;
                let list = build_ref_list(&entries)?;

                let mut builder = begin_message(opcodes::DISTRIBUTE_REWARDS, params.query_id)?;
                builder.store_ref(Arc::new(list))?;
                builder
            }
            RewardDistributorOperation::UpdateConfig(params) => {
                let mut builder = begin_message(opcodes::UPDATE_CONFIG, params.query_id)?;
                builder.store_u32(params.new_period.unwrap_or(0))?;
                builder.store_coins(params.new_min_claim_amount.unwrap_or(0))?;
                builder
            }
        };
        Ok(builder.build()?)
    }
}

/// Result of `get_user_rewards`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRewards {
    pub pending: BigInt,
    pub total_claimed: BigInt,
    /// Unix time of the last claim, 0 if never claimed.
    pub last_claim_at: u64,
}

/// Result of `get_distributor_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributorInfo {
    pub reward_pool: BigInt,
    pub distribution_period: u64,
    pub min_claim_amount: BigInt,
}

pub fn decode_user_rewards(stack: &[StackValue]) -> ContractResult<UserRewards> {
    GET_USER_REWARDS.check(stack)?;
    let mut reader = GET_USER_REWARDS.reader(stack);
    Ok(UserRewards {
        pending: reader.read_big_int()?,
        total_claimed: reader.read_big_int()?,
        last_claim_at: reader.read_int_u64()?,
    })
}

pub fn decode_distributor_info(stack: &[StackValue]) -> ContractResult<DistributorInfo> {
    GET_DISTRIBUTOR_INFO.check(stack)?;
    let mut reader = GET_DISTRIBUTOR_INFO.reader(stack);
    Ok(DistributorInfo {
        reward_pool: reader.read_big_int()?,
        distribution_period: reader.read_int_u64()?,
        min_claim_amount: reader.read_big_int()?,
    })
}

/// Reward distributor facade.
#[derive(Debug, Clone)]
pub struct RewardDistributor {
    binding: ContractBinding,
}

impl RewardDistributor {
    pub fn new(address: MsgAddress, settings: ContractSettings) -> Self {
        Self {
            binding: ContractBinding::new(address, settings),
        }
    }

    pub fn from_config(
        code: &ContractCode,
        config: &RewardDistributorConfig,
        settings: ContractSettings,
    ) -> ContractResult<Self> {
        code.ensure_kind(ContractKind::RewardDistributor)?;
        let init = ContractInit::new(code.cell.clone(), Arc::new(config.to_cell()?));
        Ok(Self {
            binding: ContractBinding::from_init(init, settings)?,
        })
    }

    pub fn address(&self) -> &MsgAddress {
        self.binding.address()
    }

    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    pub async fn send_deploy(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
    ) -> ContractResult<()> {
        self.binding.send_deploy(transport, value).await
    }

    pub async fn send_add_rewards(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: AddRewardsParams,
    ) -> ContractResult<()> {
        let body = RewardDistributorOperation::AddRewards(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_claim_rewards(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: ClaimRewardsParams,
    ) -> ContractResult<()> {
        let body = RewardDistributorOperation::ClaimRewards(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_distribute_rewards(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: DistributeRewardsParams,
    ) -> ContractResult<()> {
        let body = RewardDistributorOperation::DistributeRewards(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_update_config(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: UpdateConfigParams,
    ) -> ContractResult<()> {
        let body = RewardDistributorOperation::UpdateConfig(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn get_user_rewards(
        &self,
        transport: &dyn ContractTransport,
        user: &MsgAddress,
    ) -> ContractResult<UserRewards> {
        let args = [StackValue::address(user)?];
        let stack = self
            .binding
            .run_get_method(transport, &GET_USER_REWARDS, &args)
            .await?;
        decode_user_rewards(&stack)
    }

    pub async fn get_distributor_info(
        &self,
        transport: &dyn ContractTransport,
    ) -> ContractResult<DistributorInfo> {
        let stack = self
            .binding
            .run_get_method(transport, &GET_DISTRIBUTOR_INFO, &[])
            .await?;
        decode_distributor_info(&stack)
    }
}
