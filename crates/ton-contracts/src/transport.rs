//! Transport seam between the facades and the network.
//!
//! The facades never talk to a node directly. They hand finished messages
//! to a [`ContractTransport`] and ask it to run get-methods. Real
//! implementations live outside this crate (wallet bridges, lite clients,
//! HTTP APIs); [`InMemoryTransport`] records messages and replays scripted
//! stacks.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use ton_cell::{BagOfCells, Cell, CellBuilder, CellSlice, MsgAddress};
use tracing::trace;

use crate::error::ContractResult;
use crate::settings::SendMode;
use crate::stack::StackValue;

/// Errors reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not reach the network or the node failed.
    #[error("Network error: {0}")]
    Network(String),

    /// The contract has no get-method with this name.
    #[error("Get-method not found: {0}")]
    MethodNotFound(String),

    /// No contract is deployed at the address.
    #[error("Contract not deployed: {0}")]
    NotDeployed(String),

    /// The get-method ran and failed.
    #[error("Get-method {method} failed with exit code {code}")]
    ExitCode { method: String, code: i32 },
}

/// Result type for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// An internal message ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Destination contract.
    pub destination: MsgAddress,
    /// Attached value in nanotons.
    pub value: u128,
    /// Message body.
    pub body: Arc<Cell>,
    /// State init for deployment, if any.
    pub state_init: Option<Arc<Cell>>,
    /// Bounce flag.
    pub bounce: bool,
    /// Send mode.
    pub mode: SendMode,
}

impl OutgoingMessage {
    /// Opcode of the body: its first 32 bits, if it has that many.
    pub fn opcode(&self) -> Option<u32> {
        if self.body.bit_len() < 32 {
            return None;
        }
        CellSlice::new(&self.body).load_u32().ok()
    }

    /// Body as a base64 BoC.
    pub fn body_boc_base64(&self) -> ContractResult<String> {
        Ok(BagOfCells::new(vec![self.body.clone()]).serialize_to_base64()?)
    }

    /// State init as a base64 BoC.
    pub fn state_init_boc_base64(&self) -> ContractResult<Option<String>> {
        match &self.state_init {
            Some(state_init) => Ok(Some(
                BagOfCells::new(vec![state_init.clone()]).serialize_to_base64()?,
            )),
            None => Ok(None),
        }
    }

    /// Encode as an internal message cell (`int_msg_info$0`) with an empty
    /// source, zero fees and zero logical time; the sending wallet fills
    /// those in.
    pub fn to_cell(&self) -> ContractResult<Cell> {
        let mut builder = CellBuilder::new();

        builder.store_bit(false)?; // int_msg_info$0
        builder.store_bit(true)?; // ihr_disabled
        builder.store_bit(self.bounce)?;
        builder.store_bit(false)?; // bounced

        builder.store_address(&MsgAddress::Null)?;
        builder.store_address(&self.destination)?;
        builder.store_coins(self.value)?;
        builder.store_bit(false)?; // no extra currencies

        builder.store_coins(0)?; // ihr_fee
        builder.store_coins(0)?; // fwd_fee
        builder.store_u64(0)?; // created_lt
        builder.store_u32(0)?; // created_at

        match &self.state_init {
            Some(state_init) => {
                builder.store_bit(true)?;
                builder.store_bit(true)?;
                builder.store_ref(state_init.clone())?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }

        builder.store_bit(true)?;
        builder.store_ref(self.body.clone())?;

        Ok(builder.build()?)
    }
}

/// Submits messages and runs get-methods.
#[async_trait::async_trait]
pub trait ContractTransport: Send + Sync {
    /// Submit an internal message. Delivery and execution are reported by
    /// the transport's own channels.
    async fn send_internal_message(&self, message: OutgoingMessage) -> TransportResult<()>;

    /// Run a get-method and return its result stack.
    async fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        args: &[StackValue],
    ) -> TransportResult<Vec<StackValue>>;
}

/// A get-method invocation seen by [`InMemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMethodCall {
    pub address: MsgAddress,
    pub method: String,
    pub args: Vec<StackValue>,
}

#[derive(Debug, Clone)]
enum ScriptedResult {
    Stack(Vec<StackValue>),
    ExitCode(i32),
}

/// Transport that keeps everything in memory.
///
/// Sent messages are recorded in order. Get-method results are scripted
/// per (address, method); an address with nothing scripted is reported as
/// not deployed, and an unscripted method on a known address as not found.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    sent: RwLock<Vec<OutgoingMessage>>,
    calls: RwLock<Vec<GetMethodCall>>,
    results: RwLock<HashMap<MsgAddress, HashMap<String, ScriptedResult>>>,
    offline: RwLock<bool>,
}

impl InMemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the stack returned by `method` on `address`.
    pub async fn set_result(&self, address: &MsgAddress, method: &str, stack: Vec<StackValue>) {
        self.results
            .write()
            .await
            .entry(address.clone())
            .or_default()
            .insert(method.to_string(), ScriptedResult::Stack(stack));
    }

    /// Script `method` on `address` to fail with an exit code.
    pub async fn set_exit_code(&self, address: &MsgAddress, method: &str, code: i32) {
        self.results
            .write()
            .await
            .entry(address.clone())
            .or_default()
            .insert(method.to_string(), ScriptedResult::ExitCode(code));
    }

    /// Make every call fail with a network error.
    pub async fn set_offline(&self, offline: bool) {
        *self.offline.write().await = offline;
    }

    /// Messages submitted so far, oldest first.
    pub async fn sent_messages(&self) -> Vec<OutgoingMessage> {
        self.sent.read().await.clone()
    }

    /// Get-method calls made so far, oldest first.
    pub async fn get_method_calls(&self) -> Vec<GetMethodCall> {
        self.calls.read().await.clone()
    }

    async fn ensure_online(&self) -> TransportResult<()> {
        if *self.offline.read().await {
            return Err(TransportError::Network("transport is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContractTransport for InMemoryTransport {
    async fn send_internal_message(&self, message: OutgoingMessage) -> TransportResult<()> {
        self.ensure_online().await?;

        let mut sent = self.sent.write().await;
        trace!(
            "Recorded message #{} to {} ({} nanotons)",
            sent.len(),
            message.destination,
            message.value
        );
        sent.push(message);
        Ok(())
    }

    async fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        args: &[StackValue],
    ) -> TransportResult<Vec<StackValue>> {
        self.ensure_online().await?;

        self.calls.write().await.push(GetMethodCall {
            address: address.clone(),
            method: method.to_string(),
            args: args.to_vec(),
        });

        let results = self.results.read().await;
        let methods = results
            .get(address)
            .ok_or_else(|| TransportError::NotDeployed(address.to_string()))?;

        match methods.get(method) {
            Some(ScriptedResult::Stack(stack)) => {
                trace!("Replaying {} entries for {} on {}", stack.len(), method, address);
                Ok(stack.clone())
            }
            Some(ScriptedResult::ExitCode(code)) => Err(TransportError::ExitCode {
                method: method.to_string(),
                code: *code,
            }),
            None => Err(TransportError::MethodNotFound(method.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: Cell) -> OutgoingMessage {
        OutgoingMessage {
            destination: MsgAddress::internal(0, [1; 32]),
            value: 50_000_000,
            body: Arc::new(body),
            state_init: None,
            bounce: true,
            mode: SendMode::default(),
        }
    }

    #[test]
    fn test_opcode() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x5fcc3d14).unwrap();
        builder.store_u64(0).unwrap();
        assert_eq!(message(builder.build().unwrap()).opcode(), Some(0x5fcc3d14));
        assert_eq!(message(Cell::empty()).opcode(), None);
    }

    #[test]
    fn test_body_boc_roundtrip() {
        let mut builder = CellBuilder::new();
        builder.store_u32(2).unwrap();
        let msg = message(builder.build().unwrap());

        let encoded = msg.body_boc_base64().unwrap();
        let decoded = BagOfCells::deserialize_from_base64(&encoded).unwrap();
        assert_eq!(decoded.single_root().unwrap().hash(), msg.body.hash());
        assert_eq!(msg.state_init_boc_base64().unwrap(), None);
    }

    #[test]
    fn test_internal_message_cell() {
        let mut msg = message(Cell::empty());
        msg.state_init = Some(Arc::new(Cell::empty()));
        let cell = msg.to_cell().unwrap();

        assert_eq!(cell.reference_count(), 2);
        let mut slice = CellSlice::new(&cell);
        assert!(!slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
        assert!(!slice.load_bit().unwrap());
        assert_eq!(slice.load_address().unwrap(), MsgAddress::Null);
        assert_eq!(slice.load_address().unwrap(), msg.destination);
        assert_eq!(slice.load_coins().unwrap(), 50_000_000);
    }

    #[tokio::test]
    async fn test_in_memory_records_messages() {
        let transport = InMemoryTransport::new();
        transport
            .send_internal_message(message(Cell::empty()))
            .await
            .unwrap();
        let sent = transport.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value, 50_000_000);
    }

    #[tokio::test]
    async fn test_in_memory_get_method_errors() {
        let transport = InMemoryTransport::new();
        let addr = MsgAddress::internal(0, [2; 32]);

        assert!(matches!(
            transport.run_get_method(&addr, "get_seqno", &[]).await,
            Err(TransportError::NotDeployed(_))
        ));

        transport.set_result(&addr, "get_seqno", vec![StackValue::int(4)]).await;
        assert!(matches!(
            transport.run_get_method(&addr, "get_other", &[]).await,
            Err(TransportError::MethodNotFound(_))
        ));

        transport.set_exit_code(&addr, "get_other", 11).await;
        assert_eq!(
            transport.run_get_method(&addr, "get_other", &[]).await,
            Err(TransportError::ExitCode {
                method: "get_other".to_string(),
                code: 11
            })
        );

        assert_eq!(
            transport.run_get_method(&addr, "get_seqno", &[]).await.unwrap(),
            vec![StackValue::int(4)]
        );
        assert_eq!(transport.get_method_calls().await.len(), 4);
    }

    #[tokio::test]
    async fn test_offline() {
        let transport = InMemoryTransport::new();
        transport.set_offline(true).await;
        assert!(matches!(
            transport.send_internal_message(message(Cell::empty())).await,
            Err(TransportError::Network(_))
        ));
        assert!(transport.sent_messages().await.is_empty());
    }
}
