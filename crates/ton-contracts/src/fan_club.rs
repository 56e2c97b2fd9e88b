//! Fan club membership contract.
//!
//! Members join a club at a named tier, the owner can change a member's
//! tier, and collected membership fees are withdrawn by the owner.

use std::sync::Arc;

use num_bigint::BigInt;
use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::contract::{ContractBinding, begin_message};
use crate::error::ContractResult;
use crate::init::{ContractCode, ContractInit};
use crate::kind::ContractKind;
use crate::settings::ContractSettings;
use crate::stack::{GetMethodSpec, StackField, StackType, StackValue};
use crate::transport::ContractTransport;

pub mod opcodes {
    pub const JOIN_MEMBERSHIP: u32 = 1;
    pub const UPDATE_MEMBERSHIP: u32 = 2;
    pub const WITHDRAW: u32 = 3;
}

/// `get_membership_info(member) -> (tier, joined_at, is_active)`
pub const GET_MEMBERSHIP_INFO: GetMethodSpec = GetMethodSpec {
    name: "get_membership_info",
    args: &[StackField::new("member", StackType::Address)],
    returns: &[
        StackField::new("tier", StackType::String),
        StackField::new("joined_at", StackType::Int),
        StackField::new("is_active", StackType::Bool),
    ],
};

/// `get_club_stats() -> (total_members, total_revenue, artist_id)`
pub const GET_CLUB_STATS: GetMethodSpec = GetMethodSpec {
    name: "get_club_stats",
    args: &[],
    returns: &[
        StackField::new("total_members", StackType::Int),
        StackField::new("total_revenue", StackType::BigInt),
        StackField::new("artist_id", StackType::String),
    ],
};

pub(crate) const GET_METHODS: &[GetMethodSpec] = &[GET_MEMBERSHIP_INFO, GET_CLUB_STATS];

/// Initial data of a fan club.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanClubConfig {
    pub owner: MsgAddress,
    pub artist_id: String,
    /// Membership price in nanotons.
    pub membership_price: u128,
    pub max_supply: u32,
    /// Royalty in basis points (500 = 5%).
    pub royalty_percentage: u16,
}

impl FanClubConfig {
    /// `owner artist_id:bytes membership_price:Coins max_supply:uint32 royalty:uint16`
    ///
    /// The artist id carries no length prefix and must fit in this cell.
    pub fn to_cell(&self) -> ContractResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_address(&self.owner)?;
        builder.store_string_inline(&self.artist_id)?;
        builder.store_coins(self.membership_price)?;
        builder.store_u32(self.max_supply)?;
        builder.store_u16(self.royalty_percentage)?;
        Ok(builder.build()?)
    }

    /// Decode a config cell. The artist id is not length-prefixed, so its
    /// byte length has to be known up front.
    pub fn from_cell(cell: &Cell, artist_id_len: usize) -> ContractResult<Self> {
        let mut slice = CellSlice::new(cell);
        Ok(Self {
            owner: slice.load_address()?,
            artist_id: slice.load_string(artist_id_len)?,
            membership_price: slice.load_coins()?,
            max_supply: slice.load_u32()?,
            royalty_percentage: slice.load_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinMembershipParams {
    pub query_id: Option<u64>,
    pub member: MsgAddress,
    pub tier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMembershipParams {
    pub query_id: Option<u64>,
    pub member: MsgAddress,
    pub new_tier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawParams {
    pub query_id: Option<u64>,
    pub amount: u128,
}

/// Messages accepted by a fan club.
#[derive(Debug, Clone)]
pub enum FanClubOperation {
    JoinMembership(JoinMembershipParams),
    UpdateMembership(UpdateMembershipParams),
    Withdraw(WithdrawParams),
}

impl FanClubOperation {
    pub fn opcode(&self) -> u32 {
        match self {
            FanClubOperation::JoinMembership(_) => opcodes::JOIN_MEMBERSHIP,
            FanClubOperation::UpdateMembership(_) => opcodes::UPDATE_MEMBERSHIP,
            FanClubOperation::Withdraw(_) => opcodes::WITHDRAW,
        }
    }

    /// Encode the message body.
    ///
    /// ```text
    /// join_membership#00000001 query_id:uint64 member:MsgAddress tier:tail
    /// update_membership#00000002 query_id:uint64 member:MsgAddress new_tier:tail
    /// withdraw#00000003 query_id:uint64 amount:Coins
    /// ```
    pub fn build_body(&self) -> ContractResult<Cell> {
        let builder = match self {
            FanClubOperation::JoinMembership(params) => {
                let mut builder = begin_message(opcodes::JOIN_MEMBERSHIP, params.query_id)?;
                builder.store_address(&params.member)?;
                builder.store_string_tail(&params.tier)?;
                builder
            }
            FanClubOperation::UpdateMembership(params) => {
                let mut builder = begin_message(opcodes::UPDATE_MEMBERSHIP, params.query_id)?;
                builder.store_address(&params.member)?;
                builder.store_string_tail(&params.new_tier)?;
                builder
            }
            FanClubOperation::Withdraw(params) => {
                let mut builder = begin_message(opcodes::WITHDRAW, params.query_id)?;
                builder.store_coins(params.amount)?;
                builder
            }
        };
        Ok(builder.build()?)
    }
}

/// Result of `get_membership_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipInfo {
    pub tier: String,
    /// Unix time the member joined.
    pub joined_at: u64,
    pub is_active: bool,
}

/// Result of `get_club_stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClubStats {
    pub total_members: u64,
    pub total_revenue: BigInt,
    pub artist_id: String,
}

/// Decode a `get_membership_info` stack.
pub fn decode_membership_info(stack: &[StackValue]) -> ContractResult<MembershipInfo> {
    GET_MEMBERSHIP_INFO.check(stack)?;
    let mut reader = GET_MEMBERSHIP_INFO.reader(stack);
    Ok(MembershipInfo {
        tier: reader.read_string()?,
        joined_at: reader.read_int_u64()?,
        is_active: reader.read_bool()?,
    })
}

/// Decode a `get_club_stats` stack.
pub fn decode_club_stats(stack: &[StackValue]) -> ContractResult<ClubStats> {
    GET_CLUB_STATS.check(stack)?;
    let mut reader = GET_CLUB_STATS.reader(stack);
    Ok(ClubStats {
        total_members: reader.read_int_u64()?,
        total_revenue: reader.read_big_int()?,
        artist_id: reader.read_string()?,
    })
}

/// Fan club facade.
#[derive(Debug, Clone)]
pub struct FanClub {
    binding: ContractBinding,
}

impl FanClub {
    pub fn new(address: MsgAddress, settings: ContractSettings) -> Self {
        Self {
            binding: ContractBinding::new(address, settings),
        }
    }

    pub fn from_config(
        code: &ContractCode,
        config: &FanClubConfig,
        settings: ContractSettings,
    ) -> ContractResult<Self> {
        code.ensure_kind(ContractKind::FanClub)?;
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

    pub async fn send_join_membership(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: JoinMembershipParams,
    ) -> ContractResult<()> {
        let body = FanClubOperation::JoinMembership(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_update_membership(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: UpdateMembershipParams,
    ) -> ContractResult<()> {
        let body = FanClubOperation::UpdateMembership(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_withdraw(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: WithdrawParams,
    ) -> ContractResult<()> {
        let body = FanClubOperation::Withdraw(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    /// Membership of `member`.
    pub async fn get_membership_info(
        &self,
        transport: &dyn ContractTransport,
        member: &MsgAddress,
    ) -> ContractResult<MembershipInfo> {
        let args = [StackValue::address(member)?];
        let stack = self
            .binding
            .run_get_method(transport, &GET_MEMBERSHIP_INFO, &args)
            .await?;
        decode_membership_info(&stack)
    }

    pub async fn get_club_stats(&self, transport: &dyn ContractTransport) -> ContractResult<ClubStats> {
        let stack = self
            .binding
            .run_get_method(transport, &GET_CLUB_STATS, &[])
            .await?;
        decode_club_stats(&stack)
    }
}
