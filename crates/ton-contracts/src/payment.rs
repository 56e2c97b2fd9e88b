//! Payment processor contract: tips and purchases routed through a fee
//! taking processor.

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
    pub const TIP: u32 = 1;
    pub const PAYMENT: u32 = 2;
}

pub const GET_PAYMENT_STATS: GetMethodSpec = GetMethodSpec {
    name: "get_payment_stats",
    args: &[],
    returns: &[
        StackField::new("total_payments", StackType::Int),
        StackField::new("total_volume", StackType::BigInt),
        StackField::new("fee_basis_points", StackType::Int),
    ],
};

pub const GET_SEQNO: GetMethodSpec = GetMethodSpec {
    name: "get_seqno",
    args: &[],
    returns: &[StackField::new("seqno", StackType::Int)],
};

pub(crate) const GET_METHODS: &[GetMethodSpec] = &[GET_PAYMENT_STATS, GET_SEQNO];

/// Initial data of a payment processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    pub seqno: u32,
    pub owner: MsgAddress,
    /// Processor fee in basis points.
    pub fee_basis_points: u16,
}

impl PaymentConfig {
    /// `seqno:uint32 owner fee:uint16`
    pub fn to_cell(&self) -> ContractResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u32(self.seqno)?;
        builder.store_address(&self.owner)?;
        builder.store_u16(self.fee_basis_points)?;
        Ok(builder.build()?)
    }

    pub fn from_cell(cell: &Cell) -> ContractResult<Self> {
        let mut slice = CellSlice::new(cell);
        Ok(Self {
            seqno: slice.load_u32()?,
            owner: slice.load_address()?,
            fee_basis_points: slice.load_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipParams {
    pub query_id: Option<u64>,
    pub recipient: MsgAddress,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentParams {
    pub query_id: Option<u64>,
    pub recipient: MsgAddress,
    pub payment_type: String,
    pub item_id: String,
}

/// Messages accepted by the processor.
#[derive(Debug, Clone)]
pub enum PaymentOperation {
    Tip(TipParams),
    Payment(PaymentParams),
}

impl PaymentOperation {
    pub fn opcode(&self) -> u32 {
        match self {
            PaymentOperation::Tip(_) => opcodes::TIP,
            PaymentOperation::Payment(_) => opcodes::PAYMENT,
        }
    }

    /// Encode the message body.
    ///
    /// ```text
    /// tip#00000001 query_id:uint64 recipient:MsgAddress message:tail
    /// payment#00000002 query_id:uint64 recipient:MsgAddress payment_type:tail item_id:tail
    /// ```
    ///
    /// In `payment` the two strings are written back to back with no
    /// separator; the receiving contract splits them. `payment_type` must fit
    /// in the body cell, only `item_id` may continue into a snake chain.
    pub fn build_body(&self) -> ContractResult<Cell> {
        let builder = match self {
            PaymentOperation::Tip(params) => {
                let mut builder = begin_message(opcodes::TIP, params.query_id)?;
                builder.store_address(&params.recipient)?;
                builder.store_string_tail(&params.message)?;
                builder
            }
            PaymentOperation::Payment(params) => {
                let mut builder = begin_message(opcodes::PAYMENT, params.query_id)?;
                builder.store_address(&params.recipient)?;
                builder.store_string_inline(&params.payment_type)?;
                builder.store_string_tail(&params.item_id)?;
                builder
            }
        };
        Ok(builder.build()?)
    }
}

/// Result of `get_payment_stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStats {
    pub total_payments: u64,
    pub total_volume: BigInt,
    pub fee_basis_points: u64,
}

pub fn decode_payment_stats(stack: &[StackValue]) -> ContractResult<PaymentStats> {
    GET_PAYMENT_STATS.check(stack)?;
    let mut reader = GET_PAYMENT_STATS.reader(stack);
    Ok(PaymentStats {
        total_payments: reader.read_int_u64()?,
        total_volume: reader.read_big_int()?,
        fee_basis_points: reader.read_int_u64()?,
    })
}

pub fn decode_seqno(stack: &[StackValue]) -> ContractResult<u64> {
    GET_SEQNO.check(stack)?;
    GET_SEQNO.reader(stack).read_int_u64()
}

/// Payment processor facade.
#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    binding: ContractBinding,
}

impl PaymentProcessor {
    pub fn new(address: MsgAddress, settings: ContractSettings) -> Self {
        Self {
            binding: ContractBinding::new(address, settings),
        }
    }

    pub fn from_config(
        code: &ContractCode,
        config: &PaymentConfig,
        settings: ContractSettings,
    ) -> ContractResult<Self> {
        code.ensure_kind(ContractKind::Payment)?;
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

    /// Send a tip; `value` is the tip amount plus fees.
    pub async fn send_tip(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: TipParams,
    ) -> ContractResult<()> {
        let body = PaymentOperation::Tip(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn send_payment(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        params: PaymentParams,
    ) -> ContractResult<()> {
        let body = PaymentOperation::Payment(params).build_body()?;
        self.binding.send_body(transport, value, body).await
    }

    pub async fn get_payment_stats(
        &self,
        transport: &dyn ContractTransport,
    ) -> ContractResult<PaymentStats> {
        let stack = self
            .binding
            .run_get_method(transport, &GET_PAYMENT_STATS, &[])
            .await?;
        decode_payment_stats(&stack)
    }

    pub async fn get_seqno(&self, transport: &dyn ContractTransport) -> ContractResult<u64> {
        let stack = self
            .binding
            .run_get_method(transport, &GET_SEQNO, &[])
            .await?;
        decode_seqno(&stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;
    use crate::transport::{InMemoryTransport, TransportError};
    use ton_cell::CellError;

    fn recipient() -> MsgAddress {
        MsgAddress::internal(0, [0x55; 32])
    }

    #[test]
    fn test_config_roundtrip() {
        let config = PaymentConfig {
            seqno: 0,
            owner: MsgAddress::internal(0, [0x12; 32]),
            fee_basis_points: 250,
        };
        let cell = config.to_cell().unwrap();
        assert_eq!(cell.bit_len(), 32 + 267 + 16);
        assert_eq!(PaymentConfig::from_cell(&cell).unwrap(), config);
    }

    #[test]
    fn test_tip_layout() {
        let body = PaymentOperation::Tip(TipParams {
            query_id: Some(3),
            recipient: recipient(),
            message: "great show!".to_string(),
        })
        .build_body()
        .unwrap();

        let mut slice = CellSlice::new(&body);
        assert_eq!(slice.load_u32().unwrap(), opcodes::TIP);
        assert_eq!(slice.load_u64().unwrap(), 3);
        assert_eq!(slice.load_address().unwrap(), recipient());
        assert_eq!(slice.load_string_tail().unwrap(), "great show!");
    }

    #[test]
    fn test_payment_strings_back_to_back() {
        let body = PaymentOperation::Payment(PaymentParams {
            query_id: None,
            recipient: recipient(),
            payment_type: "ticket".to_string(),
            item_id: "A-42".to_string(),
        })
        .build_body()
        .unwrap();
        assert_eq!(body.bit_len(), 96 + 267 + 10 * 8);

        let mut slice = CellSlice::new(&body);
        slice.skip_bits(96 + 267).unwrap();
        assert_eq!(slice.load_string(6).unwrap(), "ticket");
        assert_eq!(slice.load_string(4).unwrap(), "A-42");
    }

    #[test]
    fn test_payment_type_overflow_fails() {
        // 96 + 267 + 800 bits leaves no room; the item id must not be pushed into a ref
        let result = PaymentOperation::Payment(PaymentParams {
            query_id: None,
            recipient: recipient(),
            payment_type: "t".repeat(100),
            item_id: "A-42".to_string(),
        })
        .build_body();
        assert!(matches!(
            result,
            Err(ContractError::Cell(CellError::DataTooLong(_)))
        ));
    }

    #[test]
    fn test_long_item_id_snakes() {
        let item_id = "i".repeat(200);
        let body = PaymentOperation::Payment(PaymentParams {
            query_id: None,
            recipient: recipient(),
            payment_type: "ticket".to_string(),
            item_id: item_id.clone(),
        })
        .build_body()
        .unwrap();
        assert_eq!(body.reference_count(), 1);

        let mut slice = CellSlice::new(&body);
        slice.skip_bits(96 + 267).unwrap();
        assert_eq!(slice.load_string(6).unwrap(), "ticket");
        assert_eq!(slice.load_string_tail().unwrap(), item_id);
    }

    #[test]
    fn test_decode_payment_stats() {
        let stack = vec![
            StackValue::int(10),
            StackValue::int(25_000_000_000u64),
            StackValue::int(250),
        ];
        let stats = decode_payment_stats(&stack).unwrap();
        assert_eq!(stats.total_payments, 10);
        assert_eq!(stats.total_volume, BigInt::from(25_000_000_000u64));
        assert_eq!(stats.fee_basis_points, 250);
    }

    #[tokio::test]
    async fn test_get_seqno() {
        let transport = InMemoryTransport::new();
        let processor = PaymentProcessor::new(recipient(), ContractSettings::default());
        transport
            .set_result(processor.address(), "get_seqno", vec![StackValue::int(12)])
            .await;
        assert_eq!(processor.get_seqno(&transport).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_get_method_exit_code() {
        let transport = InMemoryTransport::new();
        let processor = PaymentProcessor::new(recipient(), ContractSettings::default());
        transport
            .set_exit_code(processor.address(), "get_payment_stats", 11)
            .await;
        assert!(matches!(
            processor.get_payment_stats(&transport).await,
            Err(ContractError::Transport(TransportError::ExitCode { code: 11, .. }))
        ));
    }

    #[tokio::test]
    async fn test_send_payment_overflow_sends_nothing() {
        let transport = InMemoryTransport::new();
        let processor = PaymentProcessor::new(recipient(), ContractSettings::default());
        let result = processor
            .send_payment(
                &transport,
                2_000_000_000,
                PaymentParams {
                    query_id: None,
                    recipient: recipient(),
                    payment_type: "t".repeat(100),
                    item_id: "A-42".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(ContractError::Cell(_))));
        assert!(transport.sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_tip_and_payment() {
        let transport = InMemoryTransport::new();
        let processor = PaymentProcessor::new(recipient(), ContractSettings::default());

        processor
            .send_tip(
                &transport,
                1_000_000_000,
                TipParams {
                    query_id: None,
                    recipient: recipient(),
                    message: "hi".to_string(),
                },
            )
            .await
            .unwrap();
        processor
            .send_payment(
                &transport,
                2_000_000_000,
                PaymentParams {
                    query_id: None,
                    recipient: recipient(),
                    payment_type: "merch".to_string(),
                    item_id: "shirt".to_string(),
                },
            )
            .await
            .unwrap();

        let sent = transport.sent_messages().await;
        assert_eq!(
            sent.iter().map(|m| m.opcode()).collect::<Vec<_>>(),
            vec![Some(opcodes::TIP), Some(opcodes::PAYMENT)]
        );
        assert_eq!(sent[1].value, 2_000_000_000);
    }
}
