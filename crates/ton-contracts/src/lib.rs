//! # ton-contracts
//!
//! Message encoding and get-method decoding for the fan platform's TON
//! contracts.
//!
//! ## Overview
//!
//! Five contract kinds are supported, each in its own module:
//!
//! - **NFT Collection** ([`nft_collection`]): mints items, resolves item addresses
//! - **NFT Item** ([`nft_item`]): TEP-62 transfer and static-data requests
//! - **Fan Club** ([`fan_club`]): tiered memberships and fee withdrawal
//! - **Payment** ([`payment`]): tips and purchases through a fee-taking processor
//! - **Reward Distributor** ([`reward_distributor`]): reward pool, claims, batch payouts
//!
//! Every module follows the same shape:
//!
//! - a `*Config` record mapped 1:1 to the contract's initial data cell
//! - one `*Params` struct per operation and a `*Operation` enum that encodes
//!   the message body (`opcode:uint32 query_id:uint64` followed by the
//!   operation fields)
//! - `GET_*` get-method signatures and `decode_*` functions for their stacks
//! - a facade binding an address to `send_*` (encode then submit) and `get_*`
//!   (call then decode) operations
//!
//! Facades never talk to the network themselves. They are handed a
//! [`ContractTransport`] on every call; [`InMemoryTransport`] records
//! messages and serves scripted get-method results for tests and dry runs.
//!
//! ## Operation Codes
//!
//! Custom contracts number their operations sequentially from 1. The NFT item
//! uses the TEP-62 codes:
//!
//! - `transfer` (0x5fcc3d14)
//! - `get_static_data` (0x2fcb26a2)
//!
//! ## Example
//!
//! ```rust
//! use ton_cell::{CellSlice, MsgAddress};
//! use ton_contracts::fan_club::{FanClubOperation, JoinMembershipParams};
//!
//! let member = MsgAddress::internal(0, [0x12; 32]);
//! let body = FanClubOperation::JoinMembership(JoinMembershipParams {
//!     query_id: None,
//!     member,
//!     tier: "gold".to_string(),
//! })
//! .build_body()?;
//!
//! let mut slice = CellSlice::new(&body);
//! assert_eq!(slice.load_u32()?, 1);
//! # Ok::<(), ton_contracts::ContractError>(())
//! ```
//!
//! ## Deploying
//!
//! ```rust,no_run
//! use ton_contracts::{ContractCode, ContractKind, ContractSettings, InMemoryTransport};
//! use ton_contracts::fan_club::{FanClub, FanClubConfig};
//! use ton_cell::MsgAddress;
//!
//! async fn deploy(code_boc: &str) -> Result<(), Box<dyn std::error::Error>> {
//!     let code = ContractCode::from_base64(ContractKind::FanClub, "v1", code_boc)?;
//!     let config = FanClubConfig {
//!         owner: MsgAddress::from_string("EQASEhISEhISEhISEhISEhISEhISEhISEhISEhISEhISEuHS")?,
//!         artist_id: "artist123".to_string(),
//!         membership_price: 5_000_000_000,
//!         max_supply: 1000,
//!         royalty_percentage: 500,
//!     };
//!
//!     let club = FanClub::from_config(&code, &config, ContractSettings::default())?;
//!     let transport = InMemoryTransport::new();
//!     club.send_deploy(&transport, 50_000_000).await?;
//!     println!("Deployed to {}", club.address());
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod contract;
pub mod error;
pub mod fan_club;
pub mod init;
pub mod kind;
pub mod list;
pub mod nft_collection;
pub mod nft_item;
pub mod payment;
pub mod reward_distributor;
pub mod settings;
pub mod stack;
pub mod transport;

// Re-export main types
pub use content::{RoyaltyParams, build_offchain_content, parse_offchain_content};
pub use contract::{ContractBinding, begin_message};
pub use error::{ContractError, ContractResult};
pub use fan_club::FanClub;
pub use init::{ContractCode, ContractInit};
pub use kind::{ContractKind, ContractOperation};
pub use list::{build_ref_list, parse_ref_list};
pub use nft_collection::NftCollection;
pub use nft_item::NftItem;
pub use payment::PaymentProcessor;
pub use reward_distributor::RewardDistributor;
pub use settings::{ContractSettings, SendMode};
pub use stack::{GetMethodSpec, StackField, StackReader, StackType, StackValue, compute_method_id};
pub use transport::{
    ContractTransport, GetMethodCall, InMemoryTransport, OutgoingMessage, TransportError,
    TransportResult,
};
