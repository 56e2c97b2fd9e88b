//! NFT item contract (TEP-62 transfer and static-data messages).

use std::sync::Arc;

use num_bigint::BigInt;
use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::contract::{ContractBinding, begin_message};
use crate::error::{ContractError, ContractResult};
use crate::init::{ContractCode, ContractInit};
use crate::kind::ContractKind;
use crate::settings::ContractSettings;
use crate::stack::{GetMethodSpec, StackField, StackType, StackValue};
use crate::transport::ContractTransport;

/// Standard NFT opcodes.
pub mod opcodes {
    pub const TRANSFER: u32 = 0x5fcc3d14;
    pub const GET_STATIC_DATA: u32 = 0x2fcb26a2;
}

/// `get_nft_data() -> (init?, index, collection, owner, content)`
pub const GET_NFT_DATA: GetMethodSpec = GetMethodSpec {
    name: "get_nft_data",
    args: &[],
    returns: &[
        StackField::new("init", StackType::Bool),
        StackField::new("index", StackType::BigInt),
        StackField::new("collection", StackType::Address),
        StackField::new("owner", StackType::OptionalAddress),
        StackField::new("content", StackType::Cell),
    ],
};

pub(crate) const GET_METHODS: &[GetMethodSpec] = &[GET_NFT_DATA];

/// Initial data of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftItemConfig {
    pub owner: MsgAddress,
    pub collection: MsgAddress,
    pub item_index: u64,
    pub content: Option<Arc<Cell>>,
}

impl NftItemConfig {
    /// `owner collection item_index:uint64 ^content`
    pub fn to_cell(&self) -> ContractResult<Cell> {
        let content = self
            .content
            .clone()
            .ok_or(ContractError::MissingField("content"))?;

        let mut builder = CellBuilder::new();
        builder.store_address(&self.owner)?;
        builder.store_address(&self.collection)?;
        builder.store_u64(self.item_index)?;
        builder.store_ref(content)?;
        Ok(builder.build()?)
    }

    pub fn from_cell(cell: &Cell) -> ContractResult<Self> {
        let mut slice = CellSlice::new(cell);
        Ok(Self {
            owner: slice.load_address()?,
            collection: slice.load_address()?,
            item_index: slice.load_u64()?,
            content: Some(slice.load_ref_arc()?),
        })
    }
}

/// Ownership transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    pub query_id: Option<u64>,
    pub new_owner: MsgAddress,
    /// Where the excess value goes; `None` encodes `addr_none`.
    pub response_destination: Option<MsgAddress>,
    /// Value forwarded to the new owner with the ownership notification.
    pub forward_amount: Option<u128>,
    pub forward_payload: Option<Arc<Cell>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetStaticDataParams {
    pub query_id: Option<u64>,
}

/// Messages accepted by an item.
#[derive(Debug, Clone)]
pub enum NftItemOperation {
    Transfer(TransferParams),
    GetStaticData(GetStaticDataParams),
}

impl NftItemOperation {
    pub fn opcode(&self) -> u32 {
        match self {
            NftItemOperation::Transfer(_) => opcodes::TRANSFER,
            NftItemOperation::GetStaticData(_) => opcodes::GET_STATIC_DATA,
        }
    }

    /// Encode the message body.
    ///
    /// ```text
    /// transfer#5fcc3d14 query_id:uint64 new_owner:MsgAddress
    ///   response_destination:MsgAddress custom_payload:(Maybe ^Cell)
    ///   forward_amount:Coins forward_payload:(Maybe ^Cell)
    /// get_static_data#2fcb26a2 query_id:uint64
    /// ```
    ///
    /// The custom payload is always absent.
    pub fn build_body(&self) -> ContractResult<Cell> {
        match self {
            NftItemOperation::Transfer(params) => {
                let mut builder = begin_message(opcodes::TRANSFER, params.query_id)?;
                builder.store_address(&params.new_owner)?;
                builder.store_address_opt(params.response_destination.as_ref())?;
                builder.store_bit(false)?;
                builder.store_coins(params.forward_amount.unwrap_or(0))?;
                builder.store_maybe_ref(params.forward_payload.clone())?;
                Ok(builder.build()?)
            }
            NftItemOperation::GetStaticData(params) => {
                Ok(begin_message(opcodes::GET_STATIC_DATA, params.query_id)?.build()?)
            }
        }
    }
}

/// Result of `get_nft_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftData {
    /// Whether the item has been initialized by its collection.
    pub init: bool,
    pub index: BigInt,
    pub collection: MsgAddress,
    /// Absent until the item is initialized.
    pub owner: Option<MsgAddress>,
    pub content: Arc<Cell>,
}

/// Decode a `get_nft_data` stack.
pub fn decode_nft_data(stack: &[StackValue]) -> ContractResult<NftData> {
    GET_NFT_DATA.check(stack)?;
    let mut reader = GET_NFT_DATA.reader(stack);
    Ok(NftData {
        init: reader.read_bool()?,
        index: reader.read_big_int()?,
        collection: reader.read_address()?,
        owner: reader.read_address_opt()?,
        content: reader.read_cell()?,
    })
}

/// NFT item facade.
#[derive(Debug, Clone)]
pub struct NftItem {
    binding: ContractBinding,
}

impl NftItem {
    pub fn new(address: MsgAddress, settings: ContractSettings) -> Self {
        Self {
            binding: ContractBinding::new(address, settings),
        }
    }

    pub fn from_config(
        code: &ContractCode,
        config: &NftItemConfig,
        settings: ContractSettings,
    ) -> ContractResult<Self> {
        code.ensure_kind(ContractKind::NftItem)?;
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

    pub async fn send_transfer(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: TransferParams,
    ) -> ContractResult<()> {
        let body = NftItemOperation::Transfer(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_get_static_data(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: GetStaticDataParams,
    ) -> ContractResult<()> {
        let body = NftItemOperation::GetStaticData(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn get_nft_data(&self, transport: &dyn ContractTransport) -> ContractResult<NftData> {
        let stack = self
            .binding
            .run_get_method(transport, &GET_NFT_DATA, &[])
            .await?;
        decode_nft_data(&stack)
    }
}
