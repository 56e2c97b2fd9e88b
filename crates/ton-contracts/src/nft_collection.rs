//! NFT collection contract.
//!
//! The collection mints items, keeps the collection content and royalty
//! settings, and resolves item addresses by index.

use std::sync::Arc;

use num_bigint::BigInt;
use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::contract::{ContractBinding, begin_message};
use crate::error::{ContractError, ContractResult};
use crate::init::{ContractCode, ContractInit};
use crate::kind::ContractKind;
use crate::list::build_ref_list;
use crate::settings::ContractSettings;
use crate::stack::{GetMethodSpec, StackField, StackType, StackValue};
use crate::transport::ContractTransport;

/// Operation codes of the collection contract.
pub mod opcodes {
    /// Mint a single item.
    pub const MINT: u32 = 1;
    /// Mint several items in one message.
    pub const BATCH_MINT: u32 = 2;
    /// Hand the collection to a new owner.
    pub const CHANGE_OWNER: u32 = 3;
}

/// `get_collection_data() -> (next_item_index, content, owner)`
pub const GET_COLLECTION_DATA: GetMethodSpec = GetMethodSpec {
    name: "get_collection_data",
    args: &[],
    returns: &[
        StackField::new("next_item_index", StackType::BigInt),
        StackField::new("content", StackType::Cell),
        StackField::new("owner", StackType::Address),
    ],
};

/// `get_nft_address_by_index(index) -> address`
pub const GET_NFT_ADDRESS_BY_INDEX: GetMethodSpec = GetMethodSpec {
    name: "get_nft_address_by_index",
    args: &[StackField::new("index", StackType::Int)],
    returns: &[StackField::new("address", StackType::Address)],
};

pub(crate) const GET_METHODS: &[GetMethodSpec] = &[GET_COLLECTION_DATA, GET_NFT_ADDRESS_BY_INDEX];

/// Initial data of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftCollectionConfig {
    pub owner: MsgAddress,
    pub next_item_index: u64,
    /// Collection content (usually off-chain TEP-64).
    pub content: Option<Arc<Cell>>,
    /// Code of the item contracts the collection deploys.
    pub nft_item_code: Option<Arc<Cell>>,
    /// Royalty cell, see [`RoyaltyParams`](crate::RoyaltyParams).
    pub royalty_params: Option<Arc<Cell>>,
}

impl NftCollectionConfig {
    /// `owner next_item_index:uint64 ^content ^nft_item_code ^royalty_params`
    pub fn to_cell(&self) -> ContractResult<Cell> {
        let content = self
            .content
            .clone()
            .ok_or(ContractError::MissingField("content"))?;
        let nft_item_code = self
            .nft_item_code
            .clone()
            .ok_or(ContractError::MissingField("nft_item_code"))?;
        let royalty_params = self
            .royalty_params
            .clone()
            .ok_or(ContractError::MissingField("royalty_params"))?;

        let mut builder = CellBuilder::new();
        builder.store_address(&self.owner)?;
        builder.store_u64(self.next_item_index)?;
        builder.store_ref(content)?;
        builder.store_ref(nft_item_code)?;
        builder.store_ref(royalty_params)?;
        Ok(builder.build()?)
    }

    /// Decode a config cell.
    pub fn from_cell(cell: &Cell) -> ContractResult<Self> {
        let mut slice = CellSlice::new(cell);
        Ok(Self {
            owner: slice.load_address()?,
            next_item_index: slice.load_u64()?,
            content: Some(slice.load_ref_arc()?),
            nft_item_code: Some(slice.load_ref_arc()?),
            royalty_params: Some(slice.load_ref_arc()?),
        })
    }
}

/// Parameters of a single mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintNftParams {
    pub query_id: Option<u64>,
    pub item_index: u64,
    /// Value forwarded to the new item contract.
    pub amount: u128,
    pub owner: MsgAddress,
    pub content: Arc<Cell>,
}

/// One item of a batch mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMintItem {
    pub item_index: u64,
    pub amount: u128,
    pub owner: MsgAddress,
    pub content: Arc<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMintParams {
    pub query_id: Option<u64>,
    pub items: Vec<BatchMintItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOwnerParams {
    pub query_id: Option<u64>,
    pub new_owner: MsgAddress,
}

/// Messages accepted by the collection.
#[derive(Debug, Clone)]
pub enum NftCollectionOperation {
    Mint(MintNftParams),
    BatchMint(BatchMintParams),
    ChangeOwner(ChangeOwnerParams),
}

impl NftCollectionOperation {
    pub fn opcode(&self) -> u32 {
        match self {
            NftCollectionOperation::Mint(_) => opcodes::MINT,
            NftCollectionOperation::BatchMint(_) => opcodes::BATCH_MINT,
            NftCollectionOperation::ChangeOwner(_) => opcodes::CHANGE_OWNER,
        }
    }

    /// Encode the message body.
    ///
    /// ```text
    /// mint#00000001 query_id:uint64 item_index:uint64 amount:Coins
    ///   ^[owner:MsgAddress ^content]
    /// batch_mint#00000002 query_id:uint64 ^(list of ^[item_index amount ^[owner ^content]])
    /// change_owner#00000003 query_id:uint64 new_owner:MsgAddress
    /// ```
    pub fn build_body(&self) -> ContractResult<Cell> {
        match self {
            NftCollectionOperation::Mint(params) => {
                let mut builder = begin_message(opcodes::MINT, params.query_id)?;
                store_mint_fields(
                    &mut builder,
                    params.item_index,
                    params.amount,
                    &params.owner,
                    &params.content,
                )?;
                Ok(builder.build()?)
            }
            NftCollectionOperation::BatchMint(params) => {
                let entries = params
                    .items
                    .iter()
                    .map(|item| {
                        let mut entry = CellBuilder::new();
                        store_mint_fields(
                            &mut entry,
                            item.item_index,
                            item.amount,
                            &item.owner,
                            &item.content,
                        )?;
                        Ok(Arc::new(entry.build()?))
                    })
                    .collect::<ContractResult<Vec<_>>>()?;

                let mut builder = begin_message(opcodes::BATCH_MINT, params.query_id)?;
                builder.store_ref(Arc::new(build_ref_list(&entries)?))?;
                Ok(builder.build()?)
            }
            NftCollectionOperation::ChangeOwner(params) => {
                let mut builder = begin_message(opcodes::CHANGE_OWNER, params.query_id)?;
                builder.store_address(&params.new_owner)?;
                Ok(builder.build()?)
            }
        }
    }
}

/// `item_index:uint64 amount:Coins ^[owner ^content]`
fn store_mint_fields(
    builder: &mut CellBuilder,
    item_index: u64,
    amount: u128,
    owner: &MsgAddress,
    content: &Arc<Cell>,
) -> ContractResult<()> {
    let mut owner_cell = CellBuilder::new();
    owner_cell.store_address(owner)?;
    owner_cell.store_ref(content.clone())?;

    builder.store_u64(item_index)?;
    builder.store_coins(amount)?;
    builder.store_ref(Arc::new(owner_cell.build()?))?;
    Ok(())
}

/// Result of `get_collection_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionData {
    pub next_item_index: BigInt,
    pub content: Arc<Cell>,
    pub owner: MsgAddress,
}

/// Decode a `get_collection_data` stack.
pub fn decode_collection_data(stack: &[StackValue]) -> ContractResult<CollectionData> {
    GET_COLLECTION_DATA.check(stack)?;
    let mut reader = GET_COLLECTION_DATA.reader(stack);
    Ok(CollectionData {
        next_item_index: reader.read_big_int()?,
        content: reader.read_cell()?,
        owner: reader.read_address()?,
    })
}

/// Decode a `get_nft_address_by_index` stack.
pub fn decode_nft_address(stack: &[StackValue]) -> ContractResult<MsgAddress> {
    GET_NFT_ADDRESS_BY_INDEX.check(stack)?;
    GET_NFT_ADDRESS_BY_INDEX.reader(stack).read_address()
}

/// NFT collection facade.
#[derive(Debug, Clone)]
pub struct NftCollection {
    binding: ContractBinding,
}

impl NftCollection {
    /// Bind to a deployed collection.
    pub fn new(address: MsgAddress, settings: ContractSettings) -> Self {
        Self {
            binding: ContractBinding::new(address, settings),
        }
    }

    /// Bind to the collection deployed from `code` and `config`.
    pub fn from_config(
        code: &ContractCode,
        config: &NftCollectionConfig,
        settings: ContractSettings,
    ) -> ContractResult<Self> {
        code.ensure_kind(ContractKind::NftCollection)?;
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

    /// Deploy the collection with its state init.
    pub async fn send_deploy(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
    ) -> ContractResult<()> {
        self.binding.send_deploy(transport, value).await
    }

    pub async fn send_mint_nft(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: MintNftParams,
    ) -> ContractResult<()> {
        let body = NftCollectionOperation::Mint(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_batch_mint(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: BatchMintParams,
    ) -> ContractResult<()> {
        let body = NftCollectionOperation::BatchMint(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_change_owner(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: ChangeOwnerParams,
    ) -> ContractResult<()> {
        let body = NftCollectionOperation::ChangeOwner(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    /// Calls `get_collection_data`.
    pub async fn get_collection_data(
        &self,
        transport: &dyn ContractTransport,
    ) -> ContractResult<CollectionData> {
        let stack = self
            .binding
            .run_get_method(transport, &GET_COLLECTION_DATA, &[])
            .await?;
        decode_collection_data(&stack)
    }

    /// Calls `get_nft_address_by_index`.
    pub async fn get_nft_address_by_index(
        &self,
        transport: &dyn ContractTransport,
        index: u64,
    ) -> ContractResult<MsgAddress> {
        let stack = self
            .binding
            .run_get_method(transport, &GET_NFT_ADDRESS_BY_INDEX, &[StackValue::int(index)])
            .await?;
        decode_nft_address(&stack)
    }
}
